use anyhow::{Context, Result};
use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Daemon default: requests and gateway writes, quiet pool internals.
pub static DAEMON_FILTER: &str = "info,sqlx=warn,hyper=warn";
/// CLI default: only problems, so prompts and tables stay readable.
pub static CLI_FILTER: &str = "warn";

/// Bunyan JSON subscriber writing to `sink`. `RUST_LOG` overrides
/// `default_filter` when set.
pub fn get_subscriber<Sink>(name: &str, default_filter: &str, sink: Sink) -> impl Subscriber + Sync + Send
where
    Sink: MakeWriter + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(name.to_string(), sink))
}

/// Install `subscriber` for the whole process and forward `log` records
/// from warp, hyper and reqwest into it.
pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) -> Result<()> {
    LogTracer::init().context("Failed to install log bridge")?;
    set_global_default(subscriber).context("Failed to install tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_subscriber_writes_bunyan_json_to_sink() {
        let buffer = Buffer::default();
        let sink = buffer.clone();
        let subscriber = get_subscriber("timeclock-test", "info", move || sink.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(user_id = "bob-1", "clocked in");
            tracing::debug!("filtered out");
        });

        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let records: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "timeclock-test");
        assert_eq!(records[0]["msg"], "clocked in");
        assert_eq!(records[0]["user_id"], "bob-1");
    }
}
