use domain::{Envelope, Record};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::{encode_item, Item};
use crate::store::{BatchWriteClient, StoreError, MAX_BATCH_SIZE};

/// 取り込み処理のエラー型
/// チャンクの書き込み失敗のみが呼び出し全体の失敗になる
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("chunk {chunk_index} write failed: {source}")]
    Store {
        chunk_index: usize,
        #[source]
        source: StoreError,
    },
}

/// 書き込み結果の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub chunks_written: usize,
    pub chunks_skipped: usize,
    pub items_written: usize,
    pub records_dropped: usize,
    /// 同一チャンク内で (rkey, seq) が重複し、後着に置き換えられた件数
    pub duplicates_merged: usize,
}

/// Envelope を最大 `MAX_BATCH_SIZE` 件のチャンクに分割してストアへ書き込む
pub struct BatchWriter<C: ?Sized> {
    client: Arc<C>,
    table_name: String,
}

impl<C: BatchWriteClient + ?Sized> BatchWriter<C> {
    pub fn new(client: Arc<C>, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// 全ての Envelope を到着順にチャンク単位で書き込む
    ///
    /// 正規化・エンコードに失敗したレコードはチャンクから除外して続行する。
    /// ストアへの書き込みが失敗した時点で中断し、以降のチャンクは送信しない。
    pub async fn write_all(&self, envelopes: &[Envelope]) -> Result<WriteSummary, IngestError> {
        let chunk_count = envelopes.len().div_ceil(MAX_BATCH_SIZE);
        info!(
            table = %self.table_name,
            envelopes = envelopes.len(),
            chunks = chunk_count,
            "バッチ書き込み開始"
        );

        let mut summary = WriteSummary::default();

        for (chunk_index, chunk) in envelopes.chunks(MAX_BATCH_SIZE).enumerate() {
            let EncodedChunk {
                items,
                dropped,
                duplicates,
            } = encode_chunk(chunk);
            summary.records_dropped += dropped;
            summary.duplicates_merged += duplicates;

            if items.is_empty() {
                debug!(chunk_index, "有効なレコードが無いためチャンクをスキップ");
                summary.chunks_skipped += 1;
                continue;
            }

            let item_count = items.len();
            if let Err(source) = self.client.batch_write(&self.table_name, items).await {
                error!(
                    chunk_index,
                    chunks_written = summary.chunks_written,
                    error = %source,
                    "チャンク書き込み失敗、残りのチャンクを中断"
                );
                return Err(IngestError::Store {
                    chunk_index,
                    source,
                });
            }

            debug!(chunk_index, item_count, "チャンク書き込み成功");
            summary.chunks_written += 1;
            summary.items_written += item_count;
        }

        info!(
            chunks_written = summary.chunks_written,
            items_written = summary.items_written,
            records_dropped = summary.records_dropped,
            duplicates_merged = summary.duplicates_merged,
            "バッチ書き込み完了"
        );

        Ok(summary)
    }
}

struct EncodedChunk {
    items: Vec<Item>,
    dropped: usize,
    duplicates: usize,
}

/// チャンク内の各 Envelope を正規化してアイテムへ変換する
///
/// 失敗したレコードはログを出して除外する。
/// BatchWriteItem は同一リクエスト内のキー重複を拒否するため、
/// (rkey, seq) が同じレコードは後着を採用し、先着の位置に置く。
fn encode_chunk(chunk: &[Envelope]) -> EncodedChunk {
    let mut items = Vec::with_capacity(chunk.len());
    let mut positions: HashMap<(&str, i64), usize> = HashMap::new();
    let mut dropped = 0;
    let mut duplicates = 0;

    for envelope in chunk {
        let record = match Record::normalize(envelope) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    rkey = envelope.key(),
                    seq = envelope.sequence(),
                    error = %e,
                    "レコード JSON が不正なため除外"
                );
                dropped += 1;
                continue;
            }
        };

        let item = match encode_item(&record) {
            Ok(item) => item,
            Err(e) => {
                warn!(
                    rkey = envelope.key(),
                    seq = envelope.sequence(),
                    error = %e,
                    "DynamoDB 形式への変換に失敗したため除外"
                );
                dropped += 1;
                continue;
            }
        };

        let identity = (envelope.key(), envelope.sequence());
        match positions.get(&identity) {
            Some(&position) => {
                debug!(
                    rkey = envelope.key(),
                    seq = envelope.sequence(),
                    "同一チャンク内の重複レコードを後着で置き換え"
                );
                items[position] = item;
                duplicates += 1;
            }
            None => {
                positions.insert(identity, items.len());
                items.push(item);
            }
        }
    }

    EncodedChunk {
        items,
        dropped,
        duplicates,
    }
}
