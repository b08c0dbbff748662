//! `tracing` subscriber setup for the feeder process.
//!
//! Console lines are text or JSON; an optional log directory adds a
//! daily-rotated file written off the hot path through
//! `tracing_appender::non_blocking`. `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Call once, before any provider starts.
///
/// Returns the file writer's guard when `log_dir` is set; keep it alive for
/// the life of the process or buffered lines are lost on exit.
pub fn init_logging(
    log_level: &str,
    log_dir: Option<&str>,
    module_name: &str,
    json: bool,
) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, module_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let installed = if json {
        registry.with(fmt::layer().json().with_current_span(false)).try_init()
    } else {
        registry.with(fmt::layer().with_thread_ids(true)).try_init()
    };
    if let Err(e) = installed {
        eprintln!("{module_name}: logging already initialized: {e}");
    }

    guard
}
