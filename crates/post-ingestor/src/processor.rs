use aws_lambda_events::event::sqs::{SqsEvent, SqsMessage};
use domain::{decode_message, Envelope};
use infrastructure::{BatchWriteClient, BatchWriter, IngestError, WriteSummary};
use shared::{telemetry::record_custom_metric, AppError};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 1回の呼び出しの処理結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// 受信した SQS メッセージ数
    pub received: usize,
    /// デコードに失敗して除外したメッセージ数
    pub malformed: usize,
    pub write: WriteSummary,
}

/// SQS イベントを受け取り、投稿レコードを DynamoDB へ取り込む
pub struct PostIngestor<C: ?Sized> {
    writer: BatchWriter<C>,
}

impl<C: BatchWriteClient + ?Sized> PostIngestor<C> {
    pub fn new(writer: BatchWriter<C>) -> Self {
        Self { writer }
    }

    /// SQS イベントを処理
    ///
    /// 不正なメッセージ・レコードはログを出して除外する。
    /// チャンクの書き込みに失敗した場合のみエラーを返し、SQS にバッチ全体を再配信させる。
    pub async fn process_queue_event(&self, event: SqsEvent) -> Result<IngestSummary, IngestError> {
        let received = event.records.len();
        info!("SQS イベント処理開始: {} メッセージ", received);

        let envelopes = decode_messages(&event.records);
        let malformed = received - envelopes.len();

        let write = self.writer.write_all(&envelopes).await?;

        let summary = IngestSummary {
            received,
            malformed,
            write,
        };
        self.record_metrics(&summary);

        info!(
            received = summary.received,
            malformed = summary.malformed,
            items_written = summary.write.items_written,
            records_dropped = summary.write.records_dropped,
            "SQS イベント処理完了"
        );

        Ok(summary)
    }

    fn record_metrics(&self, summary: &IngestSummary) {
        let attributes =
            HashMap::from([("Table".to_string(), self.writer.table_name().to_string())]);

        record_custom_metric(
            "IngestedItems",
            summary.write.items_written as f64,
            attributes.clone(),
        );
        record_custom_metric(
            "DroppedMessages",
            summary.malformed as f64,
            attributes.clone(),
        );
        record_custom_metric(
            "DroppedRecords",
            summary.write.records_dropped as f64,
            attributes.clone(),
        );
        record_custom_metric(
            "MergedDuplicates",
            summary.write.duplicates_merged as f64,
            attributes,
        );
    }
}

/// 各メッセージ本文を Envelope にデコードする
/// 失敗したメッセージは到着順を保ったまま除外する
fn decode_messages(messages: &[SqsMessage]) -> Vec<Envelope> {
    let mut envelopes = Vec::with_capacity(messages.len());

    for message in messages {
        let message_id = message.message_id.as_deref().unwrap_or("unknown");

        let Some(body) = message.body.as_deref() else {
            warn!(message_id, "メッセージ本文がありません");
            continue;
        };

        match decode_message(body) {
            Ok(envelope) => {
                debug!(message_id, rkey = envelope.key(), "メッセージ解析成功");
                envelopes.push(envelope);
            }
            Err(e) => {
                warn!(message_id, kind = e.kind(), error = %e, "メッセージを除外");
            }
        }
    }

    envelopes
}

/// 取り込みエラーを Lambda に返すアプリケーションエラーへ変換
pub fn to_app_error(error: &IngestError) -> AppError {
    match error {
        IngestError::Store { .. } => AppError::DynamoDb(error.to_string()),
    }
}
