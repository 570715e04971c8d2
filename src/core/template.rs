use crate::domain::model::Record;
use crate::domain::ports::Evaluate;
use crate::utils::error::EvaluationError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const PLACEHOLDER_PATTERN: &str = r"\{\{\s*\$([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).expect("placeholder pattern is valid"))
}

/// `{{ $field }}` 佔位符求值器，支援以點分隔的巢狀路徑 (`{{ $user.id }}`)
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEvaluator;

impl TemplateEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn lookup<'r>(
        template: &str,
        path: &str,
        record: &'r Record,
    ) -> Result<&'r Value, EvaluationError> {
        let missing = || EvaluationError::MissingField {
            template: template.to_string(),
            field: path.to_string(),
        };

        let mut segments = path.split('.');
        let first = segments.next().ok_or_else(missing)?;
        let mut current = record.get(first).ok_or_else(missing)?;

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                _ => None,
            }
            .ok_or_else(missing)?;
        }

        Ok(current)
    }

    /// 佔位符以外的文字原樣保留；只有未閉合的 `{{` 或無法求值的 `{{ $...}}` 視為錯誤
    fn check_literal(template: &str, literal: &str) -> Result<(), EvaluationError> {
        let mut rest = literal;
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(EvaluationError::Syntax {
                    template: template.to_string(),
                    reason: "unterminated expression".to_string(),
                });
            };
            if after.trim_start().starts_with('$') {
                return Err(EvaluationError::Syntax {
                    template: template.to_string(),
                    reason: format!("unsupported expression '{{{{{}}}}}'", &after[..end]),
                });
            }
            rest = &after[end + 2..];
        }
        Ok(())
    }
}

pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Evaluate for TemplateEvaluator {
    fn evaluate(&self, template: &str, record: &Record) -> Result<Value, EvaluationError> {
        let re = placeholder_re();

        // 單一佔位符：保留原始型別
        if let Some(caps) = re.captures(template.trim()) {
            if let Some(whole) = caps.get(0) {
                if whole.as_str().len() == template.trim().len() {
                    return Self::lookup(template, &caps[1], record).cloned();
                }
            }
        }

        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;
        for caps in re.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            let literal = &template[last..whole.start()];
            Self::check_literal(template, literal)?;
            rendered.push_str(literal);

            let value = Self::lookup(template, &caps[1], record)?;
            rendered.push_str(&render_value(value));
            last = whole.end();
        }

        let tail = &template[last..];
        Self::check_literal(template, tail)?;
        rendered.push_str(tail);

        Ok(Value::String(rendered))
    }
}
