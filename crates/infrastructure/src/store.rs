use async_trait::async_trait;
use thiserror::Error;

use crate::models::Item;

/// 1回のバッチ書き込みで送信できる最大アイテム数（DynamoDB BatchWriteItem の上限）
pub const MAX_BATCH_SIZE: usize = 25;

/// ストア書き込みのエラー型
/// どのバリアントもチャンク全体の失敗を意味する
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("batch of {0} items exceeds the per-call limit of 25")]
    TooManyItems(usize),

    #[error("invalid write request: {0}")]
    InvalidRequest(String),

    #[error("DynamoDB request failed: {0}")]
    Request(String),

    #[error("DynamoDB returned {0} UnprocessedItems")]
    UnprocessedItems(usize),
}

/// バッチ書き込みを行うストアクライアント
///
/// 実装は呼び出し間で状態を持たず、プロセス起動時に一度だけ生成して共有する。
/// 書き込みはキー単位の上書き（upsert）であることを前提とする。
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BatchWriteClient: Send + Sync {
    /// `table_name` に `items` を一括で書き込む（最大 `MAX_BATCH_SIZE` 件）
    async fn batch_write(&self, table_name: &str, items: Vec<Item>) -> Result<(), StoreError>;
}
