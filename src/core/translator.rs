use crate::config::{DispatcherConfig, EnrichOptions, NonJsonPolicy};
use crate::domain::model::{OutputRecord, RawResponse, Record, RequestGroup, ResponseMetadata, ResponseOutcome};
use crate::domain::ports::{DispatchObserver, Warning};
use crate::utils::error::{DispatchError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const RAW_FIELD: &str = "raw";
const VALUE_FIELD: &str = "value";
const MAX_LOGGED_BODY: usize = 200;

/// 回應資料如何併入原始記錄
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichMode {
    /// 直接輸出回應記錄
    Off,
    /// 原始記錄的副本，回應放在指定欄位
    Nested(String),
    /// 原始記錄的副本，回應欄位覆蓋在最上層
    Merge,
}

impl EnrichMode {
    pub fn from_options(options: &EnrichOptions) -> Self {
        if !options.enabled || options.exclude_existing {
            EnrichMode::Off
        } else if options.target_field.is_empty() {
            EnrichMode::Merge
        } else {
            EnrichMode::Nested(options.target_field.clone())
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, EnrichMode::Off)
    }
}

enum Translated {
    Fresh(Vec<Map<String, Value>>),
    Passthrough,
}

#[derive(Debug, Clone)]
pub struct ResponseTranslator {
    require_json: bool,
    non_json: NonJsonPolicy,
    enrich: EnrichMode,
}

impl ResponseTranslator {
    pub fn new(require_json: bool, non_json: NonJsonPolicy, enrich: EnrichMode) -> Self {
        Self {
            require_json,
            non_json,
            enrich,
        }
    }

    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self::new(
            config.require_json,
            config.non_json,
            EnrichMode::from_options(&config.enrich),
        )
    }

    pub fn translate(
        &self,
        outcome: ResponseOutcome,
        group: &RequestGroup<'_>,
        observer: &dyn DispatchObserver,
    ) -> Vec<OutputRecord> {
        let response = match outcome {
            ResponseOutcome::Success(response) => response,
            ResponseOutcome::Failure { kind, message } => {
                tracing::debug!("❌ {} {} failed ({})", group.spec.method, group.spec.url, kind);
                observer.on_warning(&Warning::RequestFailed {
                    method: group.spec.method.to_string(),
                    url: group.spec.url.clone(),
                    message,
                });
                return Vec::new();
            }
        };

        if !response.is_success() {
            observer.on_warning(&Warning::BadStatus {
                method: group.spec.method.to_string(),
                url: group.spec.url.clone(),
                status_code: response.status_code,
            });
        }

        let translated = match response.json() {
            Ok(Value::Object(map)) => Translated::Fresh(vec![map]),
            Ok(Value::Array(items)) => {
                tracing::debug!("📥 {} returned {} elements", group.spec.url, items.len());
                Translated::Fresh(items.into_iter().map(element_fields).collect())
            }
            Ok(scalar) => self.fallback(&response, Some(scalar), group, observer),
            Err(e) => {
                tracing::debug!("{}", DispatchError::DecodeError(e));
                self.fallback(&response, None, group, observer)
            }
        };

        let mut outputs: Vec<OutputRecord> = match translated {
            Translated::Fresh(items) => self.correlate(items, group, observer),
            Translated::Passthrough => group
                .records
                .iter()
                .map(|record| OutputRecord::new(record.data.clone()))
                .collect(),
        };

        match response_metadata(&response) {
            Ok(metadata) => {
                for output in outputs.iter_mut() {
                    output.response = Some(metadata.clone());
                }
            }
            Err(e) => observer.on_warning(&Warning::MetadataUnavailable {
                url: group.spec.url.clone(),
                cause: e.to_string(),
            }),
        }

        outputs
    }

    /// 非 JSON 物件或陣列的回應
    fn fallback(
        &self,
        response: &RawResponse,
        scalar: Option<Value>,
        group: &RequestGroup<'_>,
        observer: &dyn DispatchObserver,
    ) -> Translated {
        if !self.require_json {
            let mut fields = Map::new();
            fields.insert(RAW_FIELD.to_string(), Value::String(response.text()));
            return Translated::Fresh(vec![fields]);
        }

        let warning = match scalar {
            Some(value) => Warning::UnparseableBody {
                url: group.spec.url.clone(),
                body: truncate(&value.to_string()),
            },
            None => Warning::NonJsonResponse {
                url: group.spec.url.clone(),
            },
        };
        observer.on_warning(&warning);

        if self.non_json == NonJsonPolicy::Passthrough || self.enrich.is_active() {
            Translated::Passthrough
        } else {
            Translated::Fresh(Vec::new())
        }
    }

    /// 批次模式下，元素數與記錄數相同時逐一對應；否則全部對應到第一筆並發出警告
    fn correlate(
        &self,
        items: Vec<Map<String, Value>>,
        group: &RequestGroup<'_>,
        observer: &dyn DispatchObserver,
    ) -> Vec<OutputRecord> {
        if !self.enrich.is_active() || group.records.len() <= 1 {
            return items
                .into_iter()
                .map(|fields| self.enrich(fields, group.primary()))
                .collect();
        }

        if items.len() == group.records.len() {
            return items
                .into_iter()
                .zip(group.records.iter())
                .map(|(fields, record)| self.enrich(fields, Some(*record)))
                .collect();
        }

        observer.on_warning(&Warning::CorrelationMismatch {
            url: group.spec.url.clone(),
            records: group.records.len(),
            elements: items.len(),
        });
        items
            .into_iter()
            .map(|fields| self.enrich(fields, group.primary()))
            .collect()
    }

    fn enrich(&self, fields: Map<String, Value>, original: Option<&Record>) -> OutputRecord {
        let Some(original) = original else {
            return OutputRecord::new(fields);
        };

        match &self.enrich {
            EnrichMode::Off => OutputRecord::new(fields),
            EnrichMode::Nested(target) => {
                let mut data = original.data.clone();
                data.insert(target.clone(), Value::Object(fields));
                OutputRecord::new(data)
            }
            EnrichMode::Merge => {
                let mut data = original.data.clone();
                data.extend(fields);
                OutputRecord::new(data)
            }
        }
    }
}

fn element_fields(element: Value) -> Map<String, Value> {
    match element {
        Value::Object(map) => map,
        other => {
            let mut fields = Map::new();
            fields.insert(VALUE_FIELD.to_string(), other);
            fields
        }
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_LOGGED_BODY {
        return body.to_string();
    }
    let mut short: String = body.chars().take(MAX_LOGGED_BODY).collect();
    short.push('…');
    short
}

pub fn response_metadata(response: &RawResponse) -> Result<ResponseMetadata> {
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers.iter() {
        let value = value
            .to_str()
            .map_err(|e| DispatchError::SerializationError {
                message: format!("header '{}': {}", name, e),
            })?;
        headers.insert(name.as_str().to_string(), value.to_string());
    }

    Ok(ResponseMetadata {
        status_code: response.status_code,
        reason: response.reason().map(str::to_string),
        url: response.url.clone(),
        headers,
        elapsed_ms: response.elapsed.as_millis() as u64,
    })
}
