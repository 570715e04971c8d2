use crate::domain::model::HttpMethod;
use crate::utils::error::{DispatchError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8181";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub http_method: HttpMethod,
    #[serde(default)]
    pub basic_auth_creds: BasicAuthCreds,
    #[serde(default)]
    pub headers: Vec<HeaderTemplate>,
    #[serde(default)]
    pub require_json: bool,
    #[serde(rename = "verifyTLS", default = "default_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub timeout: Option<TimeoutSetting>,
    #[serde(default = "default_true")]
    pub one_request_per_record: bool,
    #[serde(default)]
    pub retry_options: Option<RetryOptions>,
    #[serde(default)]
    pub enrich: EnrichOptions,
    #[serde(default)]
    pub data: Option<DataOptions>,
    #[serde(default)]
    pub body: BodyStrategy,
    #[serde(default)]
    pub non_json: NonJsonPolicy,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicAuthCreds {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// header 與 value 皆為模板；字串以外的值視為常數
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderTemplate {
    pub header: Option<Value>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamTemplate {
    pub key: Option<Value>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataOptions {
    #[serde(default)]
    pub params: Vec<ParamTemplate>,
    #[serde(default)]
    pub form_encode: bool,
}

/// 秒數，或在每筆記錄上求值的模板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeoutSetting {
    Seconds(f64),
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptions {
    #[serde(default = "default_max_retry")]
    pub max_retry: usize,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retry: default_max_retry(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub target_field: String,
    #[serde(default = "default_true")]
    pub exclude_existing: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            target_field: String::new(),
            exclude_existing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyStrategy {
    /// 整筆記錄序列化為 JSON
    #[default]
    Record,
    /// 由 data.params 組出
    Params,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonJsonPolicy {
    #[default]
    Drop,
    Passthrough,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    1
}

fn default_max_retry() -> usize {
    3
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            http_method: HttpMethod::default(),
            basic_auth_creds: BasicAuthCreds::default(),
            headers: Vec::new(),
            require_json: false,
            verify_tls: true,
            timeout: None,
            one_request_per_record: true,
            retry_options: None,
            enrich: EnrichOptions::default(),
            data: None,
            body: BodyStrategy::default(),
            non_json: NonJsonPolicy::default(),
            concurrency: default_concurrency(),
        }
    }
}

impl DispatcherConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DispatchError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DispatchError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 宿主框架以 JSON 物件傳入的選項
    pub fn from_json_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| DispatchError::ConfigValidationError {
            field: "json_parsing".to_string(),
            message: format!("Options parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DispatchError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn params(&self) -> &[ParamTemplate] {
        self.data.as_ref().map(|d| d.params.as_slice()).unwrap_or(&[])
    }

    pub fn form_encode(&self) -> bool {
        self.data.as_ref().map(|d| d.form_encode).unwrap_or(false)
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url_template("url", &self.url)?;
        validation::validate_positive_number("concurrency", self.concurrency, 1)?;

        if let Some(TimeoutSetting::Seconds(seconds)) = &self.timeout {
            validation::validate_non_negative("timeout", *seconds)?;
        }

        if let Some(retry) = &self.retry_options {
            validation::validate_non_negative("retryOptions.multiplier", retry.multiplier)?;
        }

        let creds = &self.basic_auth_creds;
        if creds.password.is_some() && creds.username.is_none() {
            return Err(DispatchError::MissingConfigError {
                field: "basicAuthCreds.username".to_string(),
            });
        }

        if self.enrich.enabled && !self.enrich.target_field.is_empty() {
            validation::validate_non_empty_string("enrich.targetField", &self.enrich.target_field)?;
        }

        Ok(())
    }
}

impl Validate for DispatcherConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
