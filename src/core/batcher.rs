use crate::config::BodyStrategy;
use crate::core::resolver::ConfigResolver;
use crate::core::template::render_value;
use crate::domain::model::{Record, RequestBody, RequestGroup, RequestSpec};
use crate::domain::ports::{DispatchObserver, Warning};
use serde_json::Value;
use std::collections::HashMap;

const CONTENT_TYPE: &str = "Content-Type";

/// 依批次策略把輸入記錄分組成請求
pub struct Batcher<'a> {
    resolver: &'a ConfigResolver<'a>,
    observer: &'a dyn DispatchObserver,
}

impl<'a> Batcher<'a> {
    pub fn new(resolver: &'a ConfigResolver<'a>, observer: &'a dyn DispatchObserver) -> Self {
        Self { resolver, observer }
    }

    pub fn batch<'r>(&self, records: &'r [Record]) -> Vec<RequestGroup<'r>> {
        if self.resolver.config().one_request_per_record {
            self.one_per_record(records)
        } else {
            self.group_by_url(records)
        }
    }

    fn resolve_url(&self, record: &Record) -> Option<String> {
        match self.resolver.resolve_url(record) {
            Ok(url) => Some(url),
            Err(e) => {
                self.observer.on_warning(&Warning::UrlEvaluation {
                    template: e.template().to_string(),
                    cause: e.to_string(),
                });
                None
            }
        }
    }

    fn one_per_record<'r>(&self, records: &'r [Record]) -> Vec<RequestGroup<'r>> {
        let config = self.resolver.config();
        let mut groups = Vec::with_capacity(records.len());

        for record in records {
            let Some(url) = self.resolve_url(record) else {
                continue;
            };

            let body = self.encode_single(self.resolver.resolve_body_value(record));
            let spec = RequestSpec {
                method: config.http_method,
                url,
                headers: with_content_type(self.resolver.resolve_headers(record), &body),
                body,
                auth: self.resolver.resolve_auth(record),
                timeout: self.resolver.resolve_timeout(record),
                verify_tls: config.verify_tls,
            };

            tracing::debug!("📦 Prepared {} {}", spec.method, spec.url);
            groups.push(RequestGroup {
                spec,
                records: vec![record],
            });
        }

        groups
    }

    /// 相同 URL 的記錄合併成一個請求；header、逾時取自群組第一筆
    fn group_by_url<'r>(&self, records: &'r [Record]) -> Vec<RequestGroup<'r>> {
        let config = self.resolver.config();
        if config.form_encode() {
            tracing::debug!("Grouped requests are always sent as JSON arrays; formEncode ignored");
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut grouped: Vec<(String, Vec<&'r Record>)> = Vec::new();

        for record in records {
            let Some(url) = self.resolve_url(record) else {
                continue;
            };
            match index.get(&url) {
                Some(&position) => grouped[position].1.push(record),
                None => {
                    index.insert(url.clone(), grouped.len());
                    grouped.push((url, vec![record]));
                }
            }
        }

        // 認證取自第一筆實際加入群組的記錄
        let auth = grouped
            .first()
            .and_then(|(_, members)| self.resolver.resolve_auth(members[0]));

        grouped
            .into_iter()
            .map(|(url, members)| {
                let first = members[0];
                let bodies: Vec<Value> = members
                    .iter()
                    .map(|record| self.resolver.resolve_body_value(record))
                    .collect();
                let body = RequestBody::Raw(Value::Array(bodies).to_string());

                let spec = RequestSpec {
                    method: config.http_method,
                    url,
                    headers: with_content_type(self.resolver.resolve_headers(first), &body),
                    body,
                    auth: auth.clone(),
                    timeout: self.resolver.resolve_timeout(first),
                    verify_tls: config.verify_tls,
                };

                tracing::debug!(
                    "📦 Prepared {} {} for {} records",
                    spec.method,
                    spec.url,
                    members.len()
                );
                RequestGroup {
                    spec,
                    records: members,
                }
            })
            .collect()
    }

    fn encode_single(&self, value: Value) -> RequestBody {
        let config = self.resolver.config();
        match (config.body, value) {
            (BodyStrategy::Params, Value::Object(params)) => {
                if params.is_empty() {
                    RequestBody::Empty
                } else if config.form_encode() {
                    RequestBody::Form(
                        params
                            .iter()
                            .map(|(key, value)| (key.clone(), render_value(value)))
                            .collect(),
                    )
                } else {
                    RequestBody::Raw(Value::Object(params).to_string())
                }
            }
            (_, value) => RequestBody::Raw(value.to_string()),
        }
    }
}

fn with_content_type(mut headers: Vec<(String, String)>, body: &RequestBody) -> Vec<(String, String)> {
    let configured = headers
        .iter()
        .any(|(key, _)| key.eq_ignore_ascii_case(CONTENT_TYPE));
    if configured {
        return headers;
    }

    match body {
        RequestBody::Raw(_) => headers.push((CONTENT_TYPE.to_string(), "application/json".to_string())),
        RequestBody::Form(_) => headers.push((
            CONTENT_TYPE.to_string(),
            "application/x-www-form-urlencoded".to_string(),
        )),
        RequestBody::Empty => {}
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        BasicAuthCreds, DataOptions, DispatcherConfig, HeaderTemplate, ParamTemplate, TimeoutSetting,
    };
    use crate::core::template::TemplateEvaluator;
    use crate::core::testing::RecordingObserver;
    use crate::domain::model::{BasicAuth, HttpMethod};
    use serde_json::json;
    use std::time::Duration;

    fn records(values: Value) -> Vec<Record> {
        values
            .as_array()
            .unwrap()
            .iter()
            .cloned()
            .map(|v| Record::try_from(v).unwrap())
            .collect()
    }

    fn header_config(url: &str) -> DispatcherConfig {
        let mut config = DispatcherConfig::new(url);
        config.headers = vec![HeaderTemplate {
            header: Some(json!("X-Id")),
            value: Some(json!("{{ $id }}")),
        }];
        config.timeout = Some(TimeoutSetting::Template("{{ $wait }}".to_string()));
        config
    }

    #[test]
    fn test_one_request_per_record_keeps_order() {
        let config = DispatcherConfig::new("http://example.com/{{ $id }}");
        let evaluator = TemplateEvaluator::new();
        let observer = RecordingObserver::default();
        let resolver = ConfigResolver::new(&config, &evaluator);
        let batcher = Batcher::new(&resolver, &observer);

        let input = records(json!([{"id": 1}, {"id": 2}, {"id": 1}]));
        let groups = batcher.batch(&input);

        assert_eq!(groups.len(), 3);
        let urls: Vec<&str> = groups.iter().map(|g| g.spec.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["http://example.com/1", "http://example.com/2", "http://example.com/1"]
        );
        assert!(groups.iter().all(|g| g.records.len() == 1));
        assert_eq!(groups[1].spec.body, RequestBody::Raw(r#"{"id":2}"#.to_string()));
        assert_eq!(groups[0].spec.method, HttpMethod::Get);
        assert!(groups[0].spec.has_header("content-type"));
        assert!(observer.warnings().is_empty());
    }

    #[test]
    fn test_url_failure_skips_only_that_record() {
        let config = DispatcherConfig::new("http://example.com/{{ $id }}");
        let evaluator = TemplateEvaluator::new();
        let observer = RecordingObserver::default();
        let resolver = ConfigResolver::new(&config, &evaluator);
        let batcher = Batcher::new(&resolver, &observer);

        let input = records(json!([{"id": 1}, {"other": true}, {"id": 3}]));
        let groups = batcher.batch(&input);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].spec.url, "http://example.com/3");
        let warnings = observer.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], Warning::UrlEvaluation { .. }));
    }

    #[test]
    fn test_grouped_by_url() {
        let mut config = header_config("http://example.com/{{ $bucket }}");
        config.one_request_per_record = false;
        let evaluator = TemplateEvaluator::new();
        let observer = RecordingObserver::default();
        let resolver = ConfigResolver::new(&config, &evaluator);
        let batcher = Batcher::new(&resolver, &observer);

        let input = records(json!([
            {"bucket": "b", "id": 1, "wait": 1},
            {"bucket": "a", "id": 2, "wait": 2},
            {"bucket": "b", "id": 3, "wait": 3}
        ]));
        let groups = batcher.batch(&input);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].spec.url, "http://example.com/b");
        assert_eq!(groups[1].spec.url, "http://example.com/a");
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(groups[0].records[1].get("id"), Some(&json!(3)));

        let RequestBody::Raw(body) = &groups[0].spec.body else {
            panic!("grouped body must be raw JSON");
        };
        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            body,
            json!([
                {"bucket": "b", "id": 1, "wait": 1},
                {"bucket": "b", "id": 3, "wait": 3}
            ])
        );

        // header 與逾時只取第一筆
        assert!(groups[0]
            .spec
            .headers
            .contains(&("X-Id".to_string(), "1".to_string())));
        assert_eq!(groups[0].spec.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_grouped_auth_skips_records_without_url() {
        let mut config = DispatcherConfig::new("http://example.com/{{ $bucket }}");
        config.one_request_per_record = false;
        config.basic_auth_creds = BasicAuthCreds {
            username: Some("{{ $user }}".to_string()),
            password: Some("secret".to_string()),
        };
        let evaluator = TemplateEvaluator::new();
        let observer = RecordingObserver::default();
        let resolver = ConfigResolver::new(&config, &evaluator);
        let batcher = Batcher::new(&resolver, &observer);

        let input = records(json!([
            {"user": "dropped"},
            {"bucket": "a", "user": "alice"},
            {"bucket": "b", "user": "bob"}
        ]));
        let groups = batcher.batch(&input);

        assert_eq!(groups.len(), 2);
        let expected = Some(BasicAuth {
            username: "alice".to_string(),
            password: "secret".to_string(),
        });
        assert_eq!(groups[0].spec.auth, expected);
        assert_eq!(groups[1].spec.auth, expected);
    }

    #[test]
    fn test_grouped_params_body_is_array_of_param_maps() {
        let mut config = DispatcherConfig::new("http://example.com/bulk");
        config.one_request_per_record = false;
        config.body = BodyStrategy::Params;
        config.data = Some(DataOptions {
            params: vec![ParamTemplate {
                key: Some(json!("name")),
                value: Some(json!("{{ $name }}")),
            }],
            form_encode: true,
        });
        let evaluator = TemplateEvaluator::new();
        let observer = RecordingObserver::default();
        let resolver = ConfigResolver::new(&config, &evaluator);
        let batcher = Batcher::new(&resolver, &observer);

        let input = records(json!([{"name": "x"}, {"name": "y"}]));
        let groups = batcher.batch(&input);

        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].spec.body,
            RequestBody::Raw(r#"[{"name":"x"},{"name":"y"}]"#.to_string())
        );
    }

    #[test]
    fn test_params_body_encoding() {
        let mut config = DispatcherConfig::new("http://example.com/post");
        config.body = BodyStrategy::Params;
        config.data = Some(DataOptions {
            params: vec![
                ParamTemplate {
                    key: Some(json!("key1")),
                    value: Some(json!("value1")),
                },
                ParamTemplate {
                    key: Some(json!("key2")),
                    value: Some(json!("{{ $n }}")),
                },
            ],
            form_encode: false,
        });
        let evaluator = TemplateEvaluator::new();
        let observer = RecordingObserver::default();

        let input = records(json!([{"n": 2}, {}]));
        {
            let resolver = ConfigResolver::new(&config, &evaluator);
            let groups = Batcher::new(&resolver, &observer).batch(&input);
            assert_eq!(
                groups[0].spec.body,
                RequestBody::Raw(r#"{"key1":"value1","key2":2}"#.to_string())
            );
        }

        config.data.as_mut().unwrap().form_encode = true;
        let resolver = ConfigResolver::new(&config, &evaluator);
        let groups = Batcher::new(&resolver, &observer).batch(&input);
        assert_eq!(
            groups[0].spec.body,
            RequestBody::Form(vec![
                ("key1".to_string(), "value1".to_string()),
                ("key2".to_string(), "2".to_string()),
            ])
        );
        assert!(groups[0].spec.headers.contains(&(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string()
        )));
        // 第二筆缺少 n，只剩 key1
        assert_eq!(
            groups[1].spec.body,
            RequestBody::Form(vec![("key1".to_string(), "value1".to_string())])
        );
    }

    #[test]
    fn test_empty_params_send_no_body() {
        let mut config = DispatcherConfig::new("http://example.com/get");
        config.body = BodyStrategy::Params;
        config.data = Some(DataOptions::default());
        let evaluator = TemplateEvaluator::new();
        let observer = RecordingObserver::default();
        let resolver = ConfigResolver::new(&config, &evaluator);

        let input = records(json!([{"a": 1}]));
        let groups = Batcher::new(&resolver, &observer).batch(&input);
        assert_eq!(groups[0].spec.body, RequestBody::Empty);
        assert!(!groups[0].spec.has_header("content-type"));
    }
}
