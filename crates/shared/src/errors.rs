use std::collections::HashMap;
use thiserror::Error;

use crate::config::ConfigError;

/// アプリケーション全体で使用されるエラー型
#[derive(Debug, Clone, Error)]
///
/// レコード単位の入力不正は取り込み処理の中で破棄されるため、
/// ここには呼び出し全体を失敗させるエラーだけが現れる。
pub enum AppError {
    // インフラストラクチャエラー
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    // システムエラー
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// エラーの重要度
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// エラーレベル
    Error,
    /// 致命的エラー
    Critical,
}

/// エラーメタデータ
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    /// エラーコード
    pub code: &'static str,
    /// エラー重要度
    pub severity: ErrorSeverity,
    /// キューの再配信で回復しうるか
    pub retryable: bool,
}

impl AppError {
    /// エラーメタデータを取得
    pub fn metadata(&self) -> ErrorMetadata {
        match self {
            AppError::DynamoDb(msg) => ErrorMetadata {
                code: "DYNAMODB_ERROR",
                severity: ErrorSeverity::Error,
                retryable: is_dynamodb_retryable(msg),
            },

            AppError::Configuration(_) => ErrorMetadata {
                code: "CONFIGURATION_ERROR",
                severity: ErrorSeverity::Critical,
                retryable: false,
            },
        }
    }

    /// Lambda ランタイムに返すエラーへ変換
    /// SQS トリガーはこのエラーを受けてバッチ全体を再配信する
    pub fn into_lambda_error(self) -> lambda_runtime::Error {
        let code = self.metadata().code;
        lambda_runtime::Error::from(format!("{code}: {self}"))
    }
}

/// DynamoDBエラーがリトライ可能かどうかを判定
fn is_dynamodb_retryable(error_message: &str) -> bool {
    let retryable_errors = [
        "ThrottlingException",
        "ProvisionedThroughputExceededException",
        "ServiceUnavailable",
        "InternalServerError",
        "RequestLimitExceeded",
        "UnprocessedItems",
    ];

    retryable_errors
        .iter()
        .any(|&err| error_message.contains(err))
}

/// エラーを重要度に応じたレベルでログに記録
pub fn log_error(error: &AppError, context: Option<HashMap<String, String>>) {
    let metadata = error.metadata();

    match metadata.severity {
        ErrorSeverity::Critical => {
            tracing::error!(
                error = %error,
                code = metadata.code,
                retryable = metadata.retryable,
                context = ?context,
                "Critical error occurred"
            );
        }
        ErrorSeverity::Error => {
            tracing::error!(
                error = %error,
                code = metadata.code,
                retryable = metadata.retryable,
                context = ?context,
                "Error occurred"
            );
        }
    }
}
