use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    // キュー メッセージのエラー
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    // レコードのエラー
    #[error("Invalid record payload: {0}")]
    InvalidPayload(String),
}

impl DomainError {
    /// エラーの種類を表す短い識別子（ログ・メトリクス用）
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::MalformedMessage(_) => "malformed_message",
            DomainError::InvalidEnvelope(_) => "invalid_envelope",
            DomainError::InvalidPayload(_) => "invalid_payload",
        }
    }
}
