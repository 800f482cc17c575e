mod processor;

use aws_lambda_events::event::sqs::SqsEvent;
use infrastructure::{BatchWriteClient, BatchWriter, DynamoDbClient};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use processor::{to_app_error, PostIngestor};
use shared::{log_error, trace_lambda_handler, tracing::init_tracing, AppError, Config};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Lambda関数のハンドラー
///
/// チャンクの書き込みに失敗した場合はエラーを返し、SQS にバッチ全体を再配信させる。
async fn function_handler<C>(
    ingestor: &PostIngestor<C>,
    event: LambdaEvent<SqsEvent>,
) -> Result<(), Error>
where
    C: BatchWriteClient + ?Sized,
{
    let (payload, context) = event.into_parts();
    let request_id = context.request_id.clone();

    trace_lambda_handler!(
        "post-ingestor",
        payload,
        context,
        |payload: SqsEvent, _context| async move {
            match ingestor.process_queue_event(payload).await {
                Ok(_) => Ok(()),
                Err(e) => {
                    let app_error = to_app_error(&e);
                    log_error(
                        &app_error,
                        Some(HashMap::from([("request_id".to_string(), request_id)])),
                    );
                    Err(app_error.into_lambda_error())
                }
            }
        }
    )
}

/// 設定を読み込む。失敗は `AppError::Configuration` として記録する
fn load_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, AppError> {
    Config::from_lookup(lookup).map_err(|e| {
        let app_error = AppError::from(e);
        log_error(
            &app_error,
            Some(HashMap::from([("phase".to_string(), "startup".to_string())])),
        );
        app_error
    })
}

/// 設定を読み込み、プロセス全体で共有する取り込み処理を組み立てる
async fn bootstrap() -> Result<PostIngestor<DynamoDbClient>, AppError> {
    let config = load_config(|name| std::env::var(name).ok())?;
    info!(
        table = %config.dynamodb_table,
        environment = %config.environment,
        "設定読み込み完了"
    );

    // DynamoDBクライアントは起動時に一度だけ初期化し、全ての呼び出しで再利用する
    let client = DynamoDbClient::new(&config).await;

    Ok(PostIngestor::new(BatchWriter::new(
        Arc::new(client),
        config.dynamodb_table,
    )))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    if let Err(e) = init_tracing() {
        eprintln!("トレーシング初期化エラー: {e}");
        // トレーシング初期化に失敗してもアプリケーションは継続
    }

    // 設定エラーは load_config で記録済み
    let ingestor = Arc::new(bootstrap().await.map_err(AppError::into_lambda_error)?);

    run(service_fn(move |event: LambdaEvent<SqsEvent>| {
        let ingestor = Arc::clone(&ingestor);
        async move { function_handler(&ingestor, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_lambda_events::event::sqs::SqsMessage;
    use infrastructure::{MockBatchWriteClient, StoreError};
    use lambda_runtime::Context;
    use shared::{ConfigError, ErrorSeverity};
    use serde_json::json;

    fn lambda_event(bodies: &[serde_json::Value]) -> LambdaEvent<SqsEvent> {
        let records = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| SqsMessage {
                message_id: Some(format!("msg-{i}")),
                body: Some(body.to_string()),
                ..Default::default()
            })
            .collect();

        let mut context = Context::default();
        context.request_id = "test-request-id".to_string();

        LambdaEvent::new(SqsEvent { records }, context)
    }

    fn ingestor(client: MockBatchWriteClient) -> PostIngestor<MockBatchWriteClient> {
        PostIngestor::new(BatchWriter::new(Arc::new(client), "FakeTable"))
    }

    #[tokio::test]
    async fn test_handler_succeeds_with_invalid_payload() {
        let mut client = MockBatchWriteClient::new();
        client.expect_batch_write().never();

        let event = lambda_event(&[json!({ "rkey": "abc", "seq": 1, "record": [1, 2] })]);
        let result = function_handler(&ingestor(client), event).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_handler_fails_when_store_fails() {
        let mut client = MockBatchWriteClient::new();
        client
            .expect_batch_write()
            .times(1)
            .returning(|_, _| Err(StoreError::Request("ThrottlingException".to_string())));

        let event = lambda_event(&[json!({
            "rkey": "abc",
            "seq": 1,
            "record": { "createdAt": "now" }
        })]);
        let error = function_handler(&ingestor(client), event)
            .await
            .unwrap_err();

        assert!(error.to_string().contains("DYNAMODB_ERROR"));
    }

    #[test]
    fn test_load_config_missing_table_is_configuration_error() {
        let error = load_config(|_| None).unwrap_err();

        assert!(matches!(
            error,
            AppError::Configuration(ConfigError::MissingVariable("DYNAMODB_TABLE"))
        ));
        assert_eq!(error.metadata().severity, ErrorSeverity::Critical);
        assert!(error
            .into_lambda_error()
            .to_string()
            .starts_with("CONFIGURATION_ERROR"));
    }

    #[test]
    fn test_load_config_reads_table_name() {
        let config = load_config(|name| {
            (name == "DYNAMODB_TABLE").then(|| "posts".to_string())
        })
        .unwrap();
        assert_eq!(config.dynamodb_table, "posts");
    }
}
