use crate::config::{BodyStrategy, DispatcherConfig, EnrichOptions};
use crate::domain::model::HttpMethod;
use serde::{Deserialize, Serialize};

/// 固定的 block 預設組合，各自只是 DispatcherConfig 的一組旗標
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum BlockVariant {
    /// 記錄本身作為 body
    #[default]
    Base,
    /// body 由 data.params 組出
    Requests,
    /// 以 POST 送出原始記錄
    PostSignal,
    /// params body，回應併入輸入記錄
    EnrichSignal,
}

impl BlockVariant {
    pub fn apply(self, mut config: DispatcherConfig) -> DispatcherConfig {
        match self {
            BlockVariant::Base => {
                config.body = BodyStrategy::Record;
            }
            BlockVariant::Requests => {
                config.body = BodyStrategy::Params;
            }
            BlockVariant::PostSignal => {
                config.http_method = HttpMethod::Post;
                config.body = BodyStrategy::Record;
            }
            BlockVariant::EnrichSignal => {
                config.body = BodyStrategy::Params;
                let target_field = config.enrich.target_field.clone();
                config.enrich = EnrichOptions {
                    enabled: !target_field.is_empty(),
                    target_field,
                    exclude_existing: false,
                };
            }
        }
        config
    }

    pub fn preset(self, url: impl Into<String>) -> DispatcherConfig {
        self.apply(DispatcherConfig::new(url))
    }
}
