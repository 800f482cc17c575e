use aws_sdk_dynamodb::types::AttributeValue;
use domain::Record;
use std::collections::HashMap;

/// DynamoDB アイテム
pub type Item = HashMap<String, AttributeValue>;

/// 正規化済みレコードを DynamoDB アイテムへ変換
///
/// JSON の数値は `N`、文字列は `S`、真偽値は `BOOL`、null は `NULL`、
/// 配列は `L`、オブジェクトは `M` になる。
pub fn encode_item(record: &Record) -> Result<Item, serde_dynamo::Error> {
    serde_dynamo::to_item(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Envelope, CREATED_AT_FIELD, KEY_FIELD, SEQUENCE_FIELD};
    use serde_json::json;

    fn record(payload: serde_json::Value) -> Record {
        let envelope = Envelope::new("3kabc", 12, payload.to_string()).unwrap();
        Record::normalize(&envelope).unwrap()
    }

    #[test]
    fn test_encode_reserved_fields() {
        let item = encode_item(&record(json!({ "text": "hello" }))).unwrap();

        assert_eq!(item.get(KEY_FIELD), Some(&AttributeValue::S("3kabc".to_string())));
        assert_eq!(item.get(SEQUENCE_FIELD), Some(&AttributeValue::N("12".to_string())));
        assert_eq!(item.get("text"), Some(&AttributeValue::S("hello".to_string())));
        assert!(matches!(item.get(CREATED_AT_FIELD), Some(AttributeValue::S(_))));
    }

    #[test]
    fn test_encode_nested_values() {
        let item = encode_item(&record(json!({
            "langs": ["ja", "en"],
            "reply": { "root": "at://x", "depth": 2 },
            "pinned": true,
            "embed": null
        })))
        .unwrap();

        assert_eq!(
            item.get("langs"),
            Some(&AttributeValue::L(vec![
                AttributeValue::S("ja".to_string()),
                AttributeValue::S("en".to_string()),
            ]))
        );
        assert!(matches!(item.get("reply"), Some(AttributeValue::M(m)) if m.len() == 2));
        assert_eq!(item.get("pinned"), Some(&AttributeValue::Bool(true)));
        assert_eq!(item.get("embed"), Some(&AttributeValue::Null(true)));
    }
}
