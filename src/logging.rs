//! Logging init for host applications: file under the XDG state dir when
//! available, stderr otherwise.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs to `$XDG_STATE_HOME/muq/muq.log`;
/// when the state directory cannot be created or opened, logs to stderr
/// instead of failing. Call once, before queue construction.
pub fn init_logging() {
    match open_log_file() {
        Ok((path, file)) => {
            install(Mutex::new(file));
            tracing::info!(path = %path.display(), "logging to file");
        }
        Err(e) => {
            install(std::io::stderr);
            tracing::warn!(error = %e, "state dir unusable, logging to stderr");
        }
    }
}

fn open_log_file() -> Result<(PathBuf, fs::File)> {
    let dirs = xdg::BaseDirectories::with_prefix("muq")?;
    let dir = dirs.get_state_home();
    fs::create_dir_all(&dir)?;
    let path = dir.join("muq.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    Ok((path, file))
}

fn install<W>(writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,muq=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
}
