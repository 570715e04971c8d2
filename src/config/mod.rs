#[cfg(feature = "cli")]
pub mod cli;
pub mod dispatcher_config;

pub use dispatcher_config::{
    BasicAuthCreds, BodyStrategy, DataOptions, DispatcherConfig, EnrichOptions, HeaderTemplate,
    NonJsonPolicy, ParamTemplate, RetryOptions, TimeoutSetting,
};

#[cfg(feature = "cli")]
use crate::core::variants::BlockVariant;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "request-dispatcher")]
#[command(about = "Turn records into HTTP requests and responses back into records")]
pub struct CliConfig {
    #[arg(long, help = "Dispatcher configuration (TOML)")]
    pub config: String,

    #[arg(long, help = "Records as a JSON array or JSON lines; stdin when omitted")]
    pub input: Option<String>,

    #[arg(long, value_enum, help = "Block preset applied on top of the config file")]
    pub variant: Option<BlockVariant>,

    #[arg(long, help = "Include raw response metadata in the output")]
    pub with_metadata: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}
