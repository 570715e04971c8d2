pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::ReqwestTransport;
pub use config::DispatcherConfig;
pub use core::{BlockVariant, Dispatcher, TemplateEvaluator};
pub use domain::model::{HttpMethod, OutputRecord, Record, ResponseMetadata};
pub use domain::ports::{DispatchObserver, Evaluate, SignalSink, Transport, Warning};
pub use utils::error::{DispatchError, EvaluationError, Result};
