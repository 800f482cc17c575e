use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use shared::{telemetry::trace_store_operation, Config};
use tracing::debug;

use crate::models::Item;
use crate::store::{BatchWriteClient, StoreError, MAX_BATCH_SIZE};

/// DynamoDB クライアント
/// プロセス起動時に一度だけ生成し、全ての呼び出しで再利用する
#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
}

impl DynamoDbClient {
    pub async fn new(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.aws_region {
            loader = loader.region(Region::new(region.clone()));
        }
        let aws_config = loader.load().await;

        // DynamoDB Local などへの接続先上書き
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.dynamodb_endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

/// アイテムを BatchWriteItem の PutRequest 群へ変換
fn build_write_requests(items: Vec<Item>) -> Result<Vec<WriteRequest>, StoreError> {
    if items.len() > MAX_BATCH_SIZE {
        return Err(StoreError::TooManyItems(items.len()));
    }

    items
        .into_iter()
        .map(|item| {
            PutRequest::builder()
                .set_item(Some(item))
                .build()
                .map(|put| WriteRequest::builder().put_request(put).build())
                .map_err(|e| StoreError::InvalidRequest(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl BatchWriteClient for DynamoDbClient {
    async fn batch_write(&self, table_name: &str, items: Vec<Item>) -> Result<(), StoreError> {
        let item_count = items.len();
        let requests = build_write_requests(items)?;

        trace_store_operation(table_name, "BatchWriteItem", item_count, || async move {
            let output = self
                .client
                .batch_write_item()
                .request_items(table_name, requests)
                .send()
                .await
                .map_err(|e| StoreError::Request(DisplayErrorContext(&e).to_string()))?;

            // 未処理アイテムはチャンクの失敗として扱い、キューの再配信に任せる
            let unprocessed: usize = output
                .unprocessed_items()
                .map(|tables| tables.values().map(Vec::len).sum())
                .unwrap_or(0);
            if unprocessed > 0 {
                return Err(StoreError::UnprocessedItems(unprocessed));
            }

            debug!("バッチ書き込み完了: {} 件", item_count);
            Ok(())
        })
        .await
    }
}
