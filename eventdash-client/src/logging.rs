use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::Context;
use tokio::task;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);
const LOG_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Keeps the non-blocking file writer alive; drop it last.
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

/// Map a configured level onto one `EnvFilter` understands, falling back to `info`.
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Install a stdout layer and a daily-rolling file layer under `log_dir`.
///
/// `RUST_LOG` directives are applied on top of `level`. Must be called from
/// inside a tokio runtime: it spawns the old-log cleanup task.
pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let normalized = normalize_level(level);
    let builder = EnvFilter::builder().with_default_directive(
        normalized
            .parse()
            .with_context(|| format!("Invalid log level '{}'", normalized))?,
    );
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| format!("Failed to create log appender in {:?}", log_dir))?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    if normalized != level.trim().to_ascii_lowercase() {
        tracing::warn!("Invalid log level '{}', defaulting to '{}'", level, normalized);
    }

    spawn_log_cleanup(log_dir, prefix.to_string());

    Ok(LoggerGuard(guard))
}

fn spawn_log_cleanup(log_dir: PathBuf, prefix: String) {
    task::spawn(async move {
        loop {
            match remove_expired_logs(&log_dir, &prefix, LOG_MAX_AGE, SystemTime::now()) {
                Ok(removed) if removed > 0 => {
                    tracing::info!("Removed {} expired log files from {:?}", removed, log_dir);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to clean up log directory {:?}: {}", log_dir, e),
            }
            tokio::time::sleep(LOG_CLEANUP_INTERVAL).await;
        }
    });
}

/// Delete `<prefix>*.log` files whose mtime is older than `max_age` relative to `now`.
fn remove_expired_logs(
    log_dir: &Path,
    prefix: &str,
    max_age: Duration,
    now: SystemTime,
) -> std::io::Result<usize> {
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(prefix) || !file_name.ends_with(".log") {
            continue;
        }

        let modified = fs::metadata(&path)?.modified()?;
        if now.duration_since(modified).unwrap_or_default() > max_age {
            fs::remove_file(&path)?;
            tracing::debug!("Deleted expired log file {}", file_name);
            removed += 1;
        }
    }

    Ok(removed)
}
