use crate::config::RetryOptions;
use crate::domain::model::{FailureKind, RequestSpec, ResponseOutcome};
use crate::domain::ports::Transport;
use crate::utils::error::DispatchError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;

/// 第 n 次重試前等待 multiplier * 2^(n-1) 秒
pub fn backoff(retry: &RetryOptions) -> impl Iterator<Item = Duration> {
    let factor_ms = (retry.multiplier * 500.0).round() as u64;
    ExponentialBackoff::from_millis(2)
        .factor(factor_ms)
        .take(retry.max_retry)
}

pub struct RequestExecutor<T: Transport> {
    transport: T,
    retry: Option<RetryOptions>,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T, retry: Option<RetryOptions>) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 只有傳輸層錯誤會重試；非 2xx 的回應照常回傳
    pub async fn execute(&self, spec: &RequestSpec) -> ResponseOutcome {
        let Some(retry) = &self.retry else {
            return match self.transport.send(spec).await {
                Ok(response) => ResponseOutcome::Success(response),
                Err(e) => {
                    let error = DispatchError::NetworkError {
                        message: e.to_string(),
                    };
                    ResponseOutcome::Failure {
                        kind: FailureKind::NetworkError,
                        message: error.to_string(),
                    }
                }
            };
        };

        let attempts = AtomicUsize::new(0);
        let result = {
            let attempts = &attempts;
            let transport = &self.transport;
            Retry::spawn(backoff(retry), move || async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let result = transport.send(spec).await;
                if let Err(e) = &result {
                    tracing::debug!(
                        "🔁 Attempt {} of {} {} failed: {}",
                        attempt,
                        spec.method,
                        spec.url,
                        e
                    );
                }
                result
            })
            .await
        };

        match result {
            Ok(response) => ResponseOutcome::Success(response),
            Err(e) => {
                let error = DispatchError::RetriesExhausted {
                    attempts: attempts.load(Ordering::SeqCst),
                    message: e.to_string(),
                };
                ResponseOutcome::Failure {
                    kind: FailureKind::RetriesExhausted,
                    message: error.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MockTransport;
    use crate::domain::model::{HttpMethod, RequestBody};

    fn spec() -> RequestSpec {
        RequestSpec {
            method: HttpMethod::Get,
            url: "http://example.com/get".to_string(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            auth: None,
            timeout: None,
            verify_tls: true,
        }
    }

    fn no_wait(max_retry: usize) -> Option<RetryOptions> {
        Some(RetryOptions {
            max_retry,
            multiplier: 0.0,
        })
    }

    #[test]
    fn test_backoff_sequence() {
        let delays: Vec<Duration> = backoff(&RetryOptions {
            max_retry: 3,
            multiplier: 1.0,
        })
        .collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test]
    async fn test_single_attempt_without_retry() {
        let executor = RequestExecutor::new(MockTransport::new().then_fail("refused"), None);

        let outcome = executor.execute(&spec()).await;

        assert!(matches!(
            outcome,
            ResponseOutcome::Failure {
                kind: FailureKind::NetworkError,
                ..
            }
        ));
        assert_eq!(executor.transport().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let transport = MockTransport::new()
            .then_fail("reset")
            .then_fail("reset")
            .then_respond(200, r#"{"ok": true}"#);
        let executor = RequestExecutor::new(transport, no_wait(2));

        let outcome = executor.execute(&spec()).await;

        let ResponseOutcome::Success(response) = outcome else {
            panic!("expected a response");
        };
        assert_eq!(response.status_code, 200);
        assert_eq!(executor.transport().sent().len(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let transport = MockTransport::new()
            .then_fail("reset")
            .then_fail("reset")
            .then_fail("reset");
        let executor = RequestExecutor::new(transport, no_wait(2));

        let outcome = executor.execute(&spec()).await;

        match outcome {
            ResponseOutcome::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::RetriesExhausted);
                assert!(message.contains("3 attempts"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(executor.transport().sent().len(), 3);
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let transport = MockTransport::new()
            .then_respond(503, "unavailable")
            .then_respond(200, "{}");
        let executor = RequestExecutor::new(transport, no_wait(3));

        let outcome = executor.execute(&spec()).await;

        let ResponseOutcome::Success(response) = outcome else {
            panic!("expected a response");
        };
        assert_eq!(response.status_code, 503);
        assert_eq!(executor.transport().sent().len(), 1);
    }
}
