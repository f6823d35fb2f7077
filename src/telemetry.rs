use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{subscriber, Instrument};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

pub fn init_subscriber(name: &str) -> anyhow::Result<()> {
    // 将`log`中的记录导入`trace`中
    // 在`trace`中显示`actix-web`的日志
    LogTracer::init()?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // 日志输出到标准输出
    let formatting_layer = BunyanFormattingLayer::new(name.into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// 在后台执行`future`，并沿用当前`span`
pub fn spawn_with_tracing<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let current_span = tracing::Span::current();
    tokio::spawn(future.instrument(current_span))
}
