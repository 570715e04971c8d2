use crate::config::DispatcherConfig;
use crate::core::variants::BlockVariant;
use crate::domain::model::{OutputRecord, Record};
use crate::utils::error::{DispatchError, Result};
use serde_json::Value;
use std::fs;
use std::io::Read;

/// 載入配置檔；只有明確指定 variant 時才套用預設組合
pub fn load_config(path: &str, variant: Option<BlockVariant>) -> Result<DispatcherConfig> {
    let config = DispatcherConfig::from_file(path)?;
    Ok(match variant {
        Some(variant) => variant.apply(config),
        None => config,
    })
}

/// 從檔案或 stdin 讀取記錄
pub fn read_records(path: Option<&str>) -> Result<Vec<Record>> {
    let content = match path {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    parse_records(&content)
}

/// 接受 JSON 陣列或 JSON lines
pub fn parse_records(content: &str) -> Result<Vec<Record>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(DispatchError::DecodeError)?
    } else {
        trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()
            .map_err(DispatchError::DecodeError)?
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            Record::try_from(value).map_err(|other| DispatchError::InvalidConfigValueError {
                field: format!("input[{}]", index),
                value: other.to_string(),
                reason: "records must be JSON objects".to_string(),
            })
        })
        .collect()
}

/// 輸出一行 JSON；with_metadata 時保留 `_response`
pub fn render_output(record: &OutputRecord, with_metadata: bool) -> Result<String> {
    let rendered = if with_metadata {
        serde_json::to_string(record)
    } else {
        serde_json::to_string(&record.data)
    };
    rendered.map_err(|e| DispatchError::SerializationError {
        message: e.to_string(),
    })
}
