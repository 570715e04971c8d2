use crate::domain::model::{RawResponse, RequestSpec};
use crate::domain::ports::{DispatchObserver, Transport, Warning};
use crate::utils::error::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct RecordingObserver {
    warnings: Mutex<Vec<Warning>>,
}

impl RecordingObserver {
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().unwrap().clone()
    }
}

impl DispatchObserver for RecordingObserver {
    fn on_warning(&self, warning: &Warning) {
        self.warnings.lock().unwrap().push(warning.clone());
    }
}

pub fn response(status_code: u16, body: &str) -> RawResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    RawResponse {
        status_code,
        url: "http://example.com/".to_string(),
        headers,
        body: body.as_bytes().to_vec(),
        elapsed: Duration::from_millis(5),
    }
}

/// 依序回傳預先排好的結果，並記下收到的請求
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    sent: Mutex<Vec<RequestSpec>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_respond(self, status_code: u16, body: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(response(status_code, body)));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Client {
                message: message.to_string(),
            }));
        self
    }

    pub fn sent(&self) -> Vec<RequestSpec> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError> {
        self.sent.lock().unwrap().push(spec.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Client {
                    message: "connection refused".to_string(),
                })
            })
            .map(|mut response| {
                response.url = spec.url.clone();
                response
            })
    }
}
