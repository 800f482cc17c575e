use serde::Deserialize;
use serde_json::value::RawValue;

use crate::errors::DomainError;

/// SQS メッセージ本文のワイヤ形式
/// `{ "rkey": <string>, "seq": <integer>, "record": <JSON object> }`
#[derive(Debug, Deserialize)]
struct QueueMessage {
    #[serde(default)]
    rkey: String,
    #[serde(default)]
    seq: i64,
    #[serde(default)]
    record: Option<Box<RawValue>>,
}

/// 検証済みのキュー メッセージ
///
/// キーとペイロードが空でないことはコンストラクタで保証される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    key: String,
    sequence: i64,
    payload: Vec<u8>,
}

impl Envelope {
    pub fn new(
        key: impl Into<String>,
        sequence: i64,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, DomainError> {
        let key = key.into();
        let payload = payload.into();

        if key.is_empty() {
            return Err(DomainError::InvalidEnvelope("rkey が空です".to_string()));
        }
        if payload.is_empty() {
            return Err(DomainError::InvalidEnvelope(format!(
                "record が空です: rkey={key}"
            )));
        }

        Ok(Self {
            key,
            sequence,
            payload,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// キュー メッセージ本文を Envelope にデコードする
///
/// JSON オブジェクトとして解析できない場合は `MalformedMessage`、
/// rkey / record が空または欠けている場合は `InvalidEnvelope` を返す。
/// `seq` が無い場合は 0、`"record": null` は record 無しとして扱う。
pub fn decode_message(body: &str) -> Result<Envelope, DomainError> {
    let message: QueueMessage =
        serde_json::from_str(body).map_err(|e| DomainError::MalformedMessage(e.to_string()))?;

    let payload = message
        .record
        .map(|raw| raw.get().as_bytes().to_vec())
        .unwrap_or_default();

    Envelope::new(message.rkey, message.seq, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_valid_message() {
        let body = json!({
            "rkey": "3kabc123",
            "seq": 42,
            "record": { "text": "hello world" }
        })
        .to_string();

        let envelope = decode_message(&body).unwrap();
        assert_eq!(envelope.key(), "3kabc123");
        assert_eq!(envelope.sequence(), 42);

        let payload: serde_json::Value = serde_json::from_slice(envelope.payload()).unwrap();
        assert_eq!(payload, json!({ "text": "hello world" }));
    }

    #[test]
    fn test_decode_accepts_zero_sequence() {
        let body = r#"{"rkey":"abc","seq":0,"record":{}}"#;
        let envelope = decode_message(body).unwrap();
        assert_eq!(envelope.sequence(), 0);
    }

    #[test]
    fn test_decode_broken_json() {
        for body in ["{this is broken}", "[1, 2]", "\"text\""] {
            let error = decode_message(body).unwrap_err();
            assert!(matches!(error, DomainError::MalformedMessage(_)), "{body}");
        }
    }

    #[test]
    fn test_decode_missing_sequence_defaults_to_zero() {
        let envelope = decode_message(r#"{"rkey":"abc","record":{"a":1}}"#).unwrap();
        assert_eq!(envelope.key(), "abc");
        assert_eq!(envelope.sequence(), 0);
    }

    #[test]
    fn test_decode_missing_key() {
        let error = decode_message(r#"{"seq":1,"record":{"a":1}}"#).unwrap_err();
        assert!(matches!(error, DomainError::InvalidEnvelope(_)));
    }

    #[test]
    fn test_decode_empty_key() {
        let error = decode_message(r#"{"rkey":"","seq":1,"record":{"a":1}}"#).unwrap_err();
        assert!(matches!(error, DomainError::InvalidEnvelope(_)));
    }

    #[test]
    fn test_decode_missing_or_null_record() {
        for body in [
            r#"{"rkey":"abc","seq":1}"#,
            r#"{"rkey":"abc","seq":1,"record":null}"#,
        ] {
            let error = decode_message(body).unwrap_err();
            assert!(matches!(error, DomainError::InvalidEnvelope(_)), "{body}");
        }
    }

    #[test]
    fn test_decode_keeps_non_object_record_raw() {
        // オブジェクトかどうかの判定は正規化時に行う
        let envelope = decode_message(r#"{"rkey":"abc","seq":1,"record":[1,2]}"#).unwrap();
        assert_eq!(envelope.payload(), b"[1,2]");
    }

    #[test]
    fn test_envelope_new_rejects_empty_payload() {
        let error = Envelope::new("abc", 1, Vec::new()).unwrap_err();
        assert_eq!(error.kind(), "invalid_envelope");
    }
}
