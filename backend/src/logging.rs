//! Tracing subscriber setup.

use crate::config::Settings;
use anyhow::anyhow;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from the configured level, else `RUST_LOG`, else `info`.
pub fn env_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the global subscriber. Logs go to stderr and, when `log_file`
/// is set, to that file as well.
///
/// Keep the returned guard alive for as long as file logging should work.
pub fn init(settings: &Settings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = env_filter(settings.log_level.as_deref());
    let stderr_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let Some(log_file) = &settings.log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()?;
        return Ok(None);
    };

    let file_name = log_file
        .file_name()
        .ok_or_else(|| anyhow!("Invalid log file path: {}", log_file.display()))?;
    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn configured_level_wins() {
        assert_eq!(env_filter(Some("warn")).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(env_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
