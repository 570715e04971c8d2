pub mod batcher;
pub mod dispatcher;
pub mod executor;
pub mod resolver;
pub mod template;
pub mod translator;
pub mod variants;

#[cfg(test)]
pub(crate) mod testing;

pub use batcher::Batcher;
pub use dispatcher::Dispatcher;
pub use executor::RequestExecutor;
pub use resolver::ConfigResolver;
pub use template::TemplateEvaluator;
pub use translator::{EnrichMode, ResponseTranslator};
pub use variants::BlockVariant;
