use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// 一筆輸入訊號：欄位名稱到任意值的有序映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            other => Err(other),
        }
    }
}

/// 附加在輸出記錄上的原始回應資訊，僅供診斷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub status_code: u16,
    pub reason: Option<String>,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    #[serde(flatten)]
    pub data: Map<String, Value>,
    #[serde(rename = "_response", skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseMetadata>,
}

impl OutputRecord {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data,
            response: None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

impl From<Record> for OutputRecord {
    fn from(record: Record) -> Self {
        Self::new(record.data)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    #[serde(rename = "GET", alias = "get")]
    Get,
    #[serde(rename = "POST", alias = "post")]
    Post,
    #[serde(rename = "PUT", alias = "put")]
    Put,
    #[serde(rename = "DELETE", alias = "delete")]
    Delete,
    #[serde(rename = "HEAD", alias = "head")]
    Head,
    #[serde(rename = "OPTIONS", alias = "options")]
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// 已序列化的 JSON 字串
    Raw(String),
    /// 以 application/x-www-form-urlencoded 送出
    Form(Vec<(String, String)>),
}

/// 已解析完成、可直接送出的請求
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub auth: Option<BasicAuth>,
    pub timeout: Option<Duration>,
    pub verify_tls: bool,
}

impl RequestSpec {
    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

/// 一個請求以及促成它的輸入記錄（逐筆模式為 1 筆，批次模式為 N 筆）
#[derive(Debug, Clone)]
pub struct RequestGroup<'a> {
    pub spec: RequestSpec,
    pub records: Vec<&'a Record>,
}

impl<'a> RequestGroup<'a> {
    /// 關聯用的記錄：批次模式下只取第一筆
    pub fn primary(&self) -> Option<&'a Record> {
        self.records.first().copied()
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status_code: u16,
    pub url: String,
    pub headers: reqwest::header::HeaderMap,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> std::result::Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn reason(&self) -> Option<&'static str> {
        reqwest::StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|status| status.canonical_reason())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NetworkError,
    RetriesExhausted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::NetworkError => "network error",
            FailureKind::RetriesExhausted => "retries exhausted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    Success(RawResponse),
    Failure { kind: FailureKind, message: String },
}
