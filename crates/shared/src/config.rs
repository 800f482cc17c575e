use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingVariable(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub dynamodb_table: String,
    pub environment: String,
    pub aws_region: Option<String>,
    pub dynamodb_endpoint: Option<String>,
}

impl Config {
    /// 環境変数を返す参照関数から設定を組み立てる（テストでは差し替え可能）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Config {
            dynamodb_table: non_empty("DYNAMODB_TABLE")
                .ok_or(ConfigError::MissingVariable("DYNAMODB_TABLE"))?,
            environment: non_empty("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()),
            aws_region: non_empty("AWS_REGION"),
            dynamodb_endpoint: non_empty("DYNAMODB_ENDPOINT"),
        })
    }
}
