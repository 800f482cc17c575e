use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::errors::DomainError;

/// Envelope のキーを格納する予約フィールド
pub const KEY_FIELD: &str = "tid";
/// Envelope のシーケンス番号を格納する予約フィールド
pub const SEQUENCE_FIELD: &str = "seq";
/// 作成日時フィールド（存在しない場合のみ付与）
pub const CREATED_AT_FIELD: &str = "createdAt";

/// 正規化済みレコード
///
/// ペイロードのフィールドに予約フィールドを注入したもの。
/// ストアのアイテムへエンコードされた後は破棄される。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// 現在時刻を使って Envelope を正規化する
    pub fn normalize(envelope: &Envelope) -> Result<Self, DomainError> {
        Self::normalize_at(envelope, Utc::now())
    }

    /// 指定時刻を createdAt の既定値として Envelope を正規化する
    pub fn normalize_at(envelope: &Envelope, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let value: Value = serde_json::from_slice(envelope.payload()).map_err(|e| {
            DomainError::InvalidPayload(format!("rkey={}: {e}", envelope.key()))
        })?;

        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(DomainError::InvalidPayload(format!(
                    "rkey={}: JSON オブジェクトではありません ({})",
                    envelope.key(),
                    json_type_name(&other)
                )))
            }
        };

        // 予約フィールドはペイロードの同名フィールドを上書きする
        fields.insert(
            KEY_FIELD.to_string(),
            Value::String(envelope.key().to_string()),
        );
        fields.insert(
            SEQUENCE_FIELD.to_string(),
            Value::from(envelope.sequence()),
        );

        fields
            .entry(CREATED_AT_FIELD)
            .or_insert_with(|| Value::String(now.to_rfc3339_opts(SecondsFormat::Secs, true)));

        Ok(Self { fields })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
