use lambda_runtime::Context;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use tracing::{error, info, instrument};

/// Lambda 関数のトレーシング情報
#[derive(Debug)]
pub struct LambdaTraceContext {
    pub function_name: String,
    pub function_version: String,
    pub request_id: String,
    pub trace_id: Option<String>,
}

impl LambdaTraceContext {
    /// Lambda Context からトレーシング情報を抽出
    pub fn from_lambda_context(context: &Context) -> Self {
        Self {
            function_name: context.env_config.function_name.clone(),
            function_version: context.env_config.version.clone(),
            request_id: context.request_id.clone(),
            trace_id: context
                .xray_trace_id
                .clone()
                .or_else(|| std::env::var("_X_AMZN_TRACE_ID").ok()),
        }
    }
}

/// Lambda 関数実行をトレースするマクロ
///
/// ハンドラーの Future をスパン内で実行し、開始・終了をログに記録する。
///
/// 引数は `(ハンドラー名, イベント, lambda_runtime::Context, |event, context| async { .. })`。
/// クロージャはイベントとコンテキストを受け取り、`Result` を返す Future を返すこと。
#[macro_export]
macro_rules! trace_lambda_handler {
    ($handler_name:expr, $event:expr, $context:expr, $handler_fn:expr) => {{
        use $crate::telemetry::{create_lambda_span, LambdaTraceContext};
        use tracing::{error, info, Instrument};

        let trace_context = LambdaTraceContext::from_lambda_context(&$context);
        let span = create_lambda_span($handler_name, &trace_context);

        async move {
            info!(
                function_name = %trace_context.function_name,
                request_id = %trace_context.request_id,
                "Lambda function started"
            );

            let result = $handler_fn($event, $context).await;

            match &result {
                Ok(_) => {
                    info!("Lambda function completed successfully");
                }
                Err(e) => {
                    error!(error = %e, "Lambda function failed");
                }
            }

            result
        }
        .instrument(span)
        .await
    }};
}

/// Lambda 関数用のスパンを作成
pub fn create_lambda_span(handler_name: &str, trace_context: &LambdaTraceContext) -> tracing::Span {
    tracing::span!(
        tracing::Level::INFO,
        "lambda_handler",
        handler = handler_name,
        function_name = %trace_context.function_name,
        function_version = %trace_context.function_version,
        request_id = %trace_context.request_id,
        trace_id = %trace_context.trace_id.as_deref().unwrap_or("none")
    )
}

/// ストア操作をトレース
#[instrument(skip(operation))]
pub async fn trace_store_operation<T, E, F, Fut>(
    table_name: &str,
    operation_name: &str,
    item_count: usize,
    operation: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start_time = std::time::Instant::now();
    let result = operation().await;
    let duration = start_time.elapsed();

    match &result {
        Ok(_) => {
            info!(
                table = table_name,
                operation = operation_name,
                item_count = item_count,
                duration_ms = duration.as_millis(),
                "DynamoDB operation completed successfully"
            );
        }
        Err(e) => {
            error!(
                table = table_name,
                operation = operation_name,
                item_count = item_count,
                duration_ms = duration.as_millis(),
                error = %e,
                "DynamoDB operation failed"
            );
        }
    }

    result
}

/// カスタムメトリクスを記録
pub fn record_custom_metric(name: &str, value: f64, attributes: HashMap<String, String>) {
    info!(
        metric_name = name,
        metric_value = value,
        ?attributes,
        "Custom metric recorded"
    );
}
