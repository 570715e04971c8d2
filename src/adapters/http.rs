use crate::domain::model::{HttpMethod, RawResponse, RequestBody, RequestSpec};
use crate::domain::ports::Transport;
use crate::utils::error::{Result, TransportError};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Instant;

const USER_AGENT: &str = concat!("request-dispatcher/", env!("CARGO_PKG_VERSION"));

/// 以 reqwest 實作的 HTTP 傳輸；依 TLS 驗證設定選用不同的 client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    verifying: Client,
    insecure: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let verifying = Client::builder().user_agent(USER_AGENT).build()?;
        let insecure = Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            verifying,
            insecure,
        })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

pub fn form_encode(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, spec: &RequestSpec) -> std::result::Result<RawResponse, TransportError> {
        let client = if spec.verify_tls {
            &self.verifying
        } else {
            &self.insecure
        };

        let mut request = client.request(method(spec.method), &spec.url);

        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(auth) = &spec.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        if let Some(timeout) = spec.timeout {
            request = request.timeout(timeout);
        }

        request = match &spec.body {
            RequestBody::Empty => request,
            RequestBody::Raw(body) => request.body(body.clone()),
            RequestBody::Form(pairs) => request.body(form_encode(pairs)),
        };

        tracing::debug!("📡 Sending {} {}", spec.method, spec.url);
        let started = Instant::now();
        let response = request.send().await?;

        let status_code = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        tracing::debug!("📡 {} {} -> {}", spec.method, spec.url, status_code);

        Ok(RawResponse {
            status_code,
            url,
            headers,
            body,
            elapsed: started.elapsed(),
        })
    }
}
