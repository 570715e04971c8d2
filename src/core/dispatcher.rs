use crate::adapters::http::ReqwestTransport;
use crate::config::DispatcherConfig;
use crate::core::batcher::Batcher;
use crate::core::executor::RequestExecutor;
use crate::core::resolver::ConfigResolver;
use crate::core::template::TemplateEvaluator;
use crate::core::translator::ResponseTranslator;
use crate::domain::model::{OutputRecord, Record};
use crate::domain::ports::{DispatchObserver, Evaluate, SignalSink, Transport, TracingObserver};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;

/// 記錄進、HTTP 請求出，再把回應轉回記錄
pub struct Dispatcher<T: Transport = ReqwestTransport> {
    config: DispatcherConfig,
    executor: RequestExecutor<T>,
    translator: ResponseTranslator,
    evaluator: Arc<dyn Evaluate>,
    observer: Arc<dyn DispatchObserver>,
}

impl Dispatcher<ReqwestTransport> {
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn with_transport(config: DispatcherConfig, transport: T) -> Self {
        let executor = RequestExecutor::new(transport, config.retry_options.clone());
        let translator = ResponseTranslator::from_config(&config);
        Self {
            config,
            executor,
            translator,
            evaluator: Arc::new(TemplateEvaluator::new()),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluate>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        self.executor.transport()
    }

    /// 處理一個批次並回傳所有輸出記錄；個別請求的失敗只會以警告呈現
    pub async fn dispatch(&self, records: &[Record]) -> Vec<OutputRecord> {
        let resolver = ConfigResolver::new(&self.config, self.evaluator.as_ref());
        let observer = self.observer.as_ref();
        let groups = Batcher::new(&resolver, observer).batch(records);

        tracing::debug!(
            "📦 {} records grouped into {} requests",
            records.len(),
            groups.len()
        );

        let translated: Vec<Vec<OutputRecord>> = stream::iter(groups.iter())
            .map(|group| async move {
                let outcome = self.executor.execute(&group.spec).await;
                self.translator.translate(outcome, group, observer)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let outputs: Vec<OutputRecord> = translated.into_iter().flatten().collect();
        tracing::info!(
            "✅ Processed {} records with {} requests, {} records out",
            records.len(),
            groups.len(),
            outputs.len()
        );
        outputs
    }

    /// 宿主框架的進入點：有輸出時才通知 sink（每批次至多一次）
    pub async fn process_signals(&self, records: &[Record], sink: &dyn SignalSink) -> usize {
        let outputs = self.dispatch(records).await;
        let count = outputs.len();
        if count > 0 {
            sink.notify_signals(outputs);
        }
        count
    }
}
