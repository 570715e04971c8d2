use crate::domain::model::{OutputRecord, RawResponse, Record, RequestSpec};
use crate::utils::error::{EvaluationError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// HTTP 傳輸：每次呼叫送出一個請求
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError>;
}

/// 將設定模板套用在單筆記錄上
pub trait Evaluate: Send + Sync {
    fn evaluate(&self, template: &str, record: &Record) -> Result<Value, EvaluationError>;
}

/// 接收批次處理的輸出記錄
pub trait SignalSink: Send + Sync {
    fn notify_signals(&self, records: Vec<OutputRecord>);
}

impl<F> SignalSink for F
where
    F: Fn(Vec<OutputRecord>) + Send + Sync,
{
    fn notify_signals(&self, records: Vec<OutputRecord>) {
        self(records)
    }
}

/// 使用者可見的警告。批次內的錯誤只會透過這裡呈現
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    UrlEvaluation { template: String, cause: String },
    RequestFailed { method: String, url: String, message: String },
    BadStatus { method: String, url: String, status_code: u16 },
    NonJsonResponse { url: String },
    UnparseableBody { url: String, body: String },
    MetadataUnavailable { url: String, cause: String },
    CorrelationMismatch { url: String, records: usize, elements: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UrlEvaluation { template, cause } => {
                write!(f, "Failed to evaluate url {}: {}", template, cause)
            }
            Warning::RequestFailed { method, url, message } => {
                write!(f, "Bad Http Request: {} {}: {}", method, url, message)
            }
            Warning::BadStatus {
                method,
                url,
                status_code,
            } => write!(
                f,
                "{} request to {} returned with response code: {}",
                method, url, status_code
            ),
            Warning::NonJsonResponse { url } => write!(
                f,
                "Request to {} was successful, but response was not valid JSON. No response signal was created.",
                url
            ),
            Warning::UnparseableBody { url, body } => write!(
                f,
                "Response body from {} could not be parsed into signal(s): {}",
                url, body
            ),
            Warning::MetadataUnavailable { url, cause } => {
                write!(f, "Response from {} failed to save to signal: {}", url, cause)
            }
            Warning::CorrelationMismatch {
                url,
                records,
                elements,
            } => write!(
                f,
                "Response from {} has {} elements for {} records; enriching the first record only",
                url, elements, records
            ),
        }
    }
}

pub trait DispatchObserver: Send + Sync {
    fn on_warning(&self, warning: &Warning);
}

/// 預設觀察者：直接寫入 tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_warning(&self, warning: &Warning) {
        tracing::warn!("⚠️ {}", warning);
    }
}
