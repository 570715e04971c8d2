use crate::config::{BodyStrategy, DispatcherConfig, TimeoutSetting};
use crate::core::template::render_value;
use crate::domain::model::{BasicAuth, Record};
use crate::domain::ports::Evaluate;
use crate::utils::error::EvaluationError;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::time::Duration;

/// 將設定中的模板套用到單筆記錄，得到具體的請求參數
pub struct ConfigResolver<'c> {
    config: &'c DispatcherConfig,
    evaluator: &'c dyn Evaluate,
}

/// null 與空字串視為「未提供」
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

impl<'c> ConfigResolver<'c> {
    pub fn new(config: &'c DispatcherConfig, evaluator: &'c dyn Evaluate) -> Self {
        Self { config, evaluator }
    }

    pub fn config(&self) -> &DispatcherConfig {
        self.config
    }

    fn evaluate_value(&self, template: &Value, record: &Record) -> Result<Value, EvaluationError> {
        match template {
            Value::String(s) => self.evaluator.evaluate(s, record),
            other => Ok(other.clone()),
        }
    }

    /// URL 求值失敗時，該筆記錄（或群組）不會送出請求
    pub fn resolve_url(&self, record: &Record) -> Result<String, EvaluationError> {
        let value = self.evaluator.evaluate(&self.config.url, record)?;
        Ok(render_value(&value))
    }

    pub fn resolve_headers(&self, record: &Record) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        for template in &self.config.headers {
            let (Some(name), Some(value)) = (&template.header, &template.value) else {
                continue;
            };

            let name = match self.evaluate_value(name, record) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("Skipping header: {}", e);
                    continue;
                }
            };
            let value = match self.evaluate_value(value, record) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("Skipping header {}: {}", render_value(&name), e);
                    continue;
                }
            };

            if !is_present(&name) || !is_present(&value) {
                continue;
            }

            let (name, value) = (render_value(&name), render_value(&value));
            if HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(&value).is_err() {
                tracing::debug!("Skipping header {}: not a valid HTTP header", name.escape_debug());
                continue;
            }
            headers.push((name, value));
        }

        headers
    }

    /// key 或 value 缺少（或求值失敗）的參數會被略過
    pub fn resolve_params(&self, record: &Record) -> Map<String, Value> {
        let mut params = Map::new();

        for template in self.config.params() {
            let key = template
                .key
                .as_ref()
                .and_then(|k| self.evaluate_value(k, record).ok())
                .filter(is_present);
            let value = template
                .value
                .as_ref()
                .and_then(|v| self.evaluate_value(v, record).ok())
                .filter(is_present);

            match (key, value) {
                (Some(key), Some(value)) => {
                    params.insert(render_value(&key), value);
                }
                _ => tracing::debug!("Dropping incomplete parameter {:?}", template),
            }
        }

        params
    }

    /// 未設定、為零或無法解析時代表不設逾時
    pub fn resolve_timeout(&self, record: &Record) -> Option<Duration> {
        let seconds = match self.config.timeout.as_ref()? {
            TimeoutSetting::Seconds(seconds) => *seconds,
            TimeoutSetting::Template(template) => match self.evaluator.evaluate(template, record) {
                Ok(Value::Number(n)) => n.as_f64()?,
                Ok(Value::String(s)) => s.trim().parse::<f64>().ok()?,
                Ok(other) => {
                    tracing::debug!("Ignoring non-numeric timeout {}", other);
                    return None;
                }
                Err(e) => {
                    tracing::debug!("Ignoring timeout: {}", e);
                    return None;
                }
            },
        };

        if seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).ok()
        } else {
            None
        }
    }

    pub fn resolve_auth(&self, record: &Record) -> Option<BasicAuth> {
        let creds = &self.config.basic_auth_creds;
        let username = match self.evaluator.evaluate(creds.username.as_deref()?, record) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("No basic auth attached: {}", e);
                return None;
            }
        };
        if !is_present(&username) {
            return None;
        }

        let password = match creds.password.as_deref() {
            Some(template) => self
                .evaluator
                .evaluate(template, record)
                .map(|v| if v.is_null() { String::new() } else { render_value(&v) })
                .unwrap_or_default(),
            None => String::new(),
        };

        Some(BasicAuth {
            username: render_value(&username),
            password,
        })
    }

    /// 單筆記錄的請求內容（尚未序列化）
    pub fn resolve_body_value(&self, record: &Record) -> Value {
        match self.config.body {
            BodyStrategy::Record => record.to_value(),
            BodyStrategy::Params => Value::Object(self.resolve_params(record)),
        }
    }
}
