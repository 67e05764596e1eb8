use std::sync::Arc;

use time::{format_description::well_known::Iso8601, UtcOffset};
use tracing_subscriber::{
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
};

use crate::{Error, LoggingConfig, Result};

/// Syncs the log file to disk when dropped.
struct Guard {
    file: Option<Arc<std::fs::File>>,
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            // Nowhere left to report a failure.
            let _ = file.sync_all();
        }
    }
}

fn logging_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Logging(e.to_string())
}

/// Install a global tracing subscriber logging to console and file, both
/// optional.
///
/// The level is taken from `RUST_LOG`. Dropping the returned guard syncs the
/// log file to disk. Logging itself continues after the drop.
pub fn init_logging(cfg: &LoggingConfig) -> Result<impl Drop> {
    // Timestamps use the UTC offset at startup.
    let secs = chrono::Local::now().offset().local_minus_utc();
    let offset = UtcOffset::from_whole_seconds(secs).map_err(logging_error)?;
    let timer = OffsetTime::new(offset, Iso8601::DEFAULT);

    let log_file = match &cfg.log_file {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|source| Error::Open {
                path: path.clone(),
                source,
            })?;
            Some(Arc::new(file))
        }
        None => None,
    };

    let file_layer = if let Some(file) = &log_file {
        Some(
            fmt::layer()
                .with_timer(timer.clone())
                .with_writer(file.clone())
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
    } else {
        None
    };

    let console_layer = if cfg.disable_console {
        None
    } else {
        Some(
            fmt::layer()
                .with_timer(timer)
                .with_ansi(!cfg!(windows))
                .with_file(true)
                .with_line_number(true),
        )
    };

    let collector = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(tracing_subscriber::filter::EnvFilter::from_default_env());
    tracing::subscriber::set_global_default(collector).map_err(logging_error)?;

    let log_var = match std::env::var("RUST_LOG") {
        Ok(var) => format!(" with RUST_LOG=\"{var}\"."),
        Err(_) => ".".to_string(),
    };
    if let Some(path) = &cfg.log_file {
        tracing::debug!("Logging initiated to file \"{}\"{log_var}", path.display());
    }
    if !cfg.disable_console {
        tracing::debug!("Logging initiated to console{log_var}");
    }

    Ok(Guard { file: log_file })
}
