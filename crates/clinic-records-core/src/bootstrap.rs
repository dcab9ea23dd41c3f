//! Process startup: configuration, logging and the clinic session.

use anyhow::Context;
use log::info;
use std::path::PathBuf;

use crate::config::ClinicConfig;
use crate::logging::init_logging;
use crate::session::Clinic;
use crate::store::PendingOpen;

/// Load configuration from `config_path` (or the default location) and start.
pub fn start_from(config_path: Option<PathBuf>) -> anyhow::Result<Clinic> {
    let config = ClinicConfig::load_from(config_path).context("loading clinic configuration")?;
    start(&config)
}

/// Initialize logging and open the clinic store synchronously.
pub fn start(config: &ClinicConfig) -> anyhow::Result<Clinic> {
    prepare(config)?;
    let options = config.store_options();
    Clinic::open(&options).with_context(|| match &options.path {
        Some(path) => format!("opening clinic store at {}", path.display()),
        None => "opening in-memory clinic store".to_string(),
    })
}

/// Initialize logging and start opening the store in the background.
///
/// The returned session is closed until the pending result is passed to
/// [`Clinic::complete_open`].
pub fn start_in_background(config: &ClinicConfig) -> anyhow::Result<(Clinic, PendingOpen)> {
    prepare(config)?;
    Ok(Clinic::begin_open(config.store_options()))
}

fn prepare(config: &ClinicConfig) -> anyhow::Result<()> {
    if let Some(dir) = &config.logging.directory {
        init_logging(&config.logging.level, dir)
            .with_context(|| format!("initializing logging in {}", dir.display()))?;
    }

    if let Some(path) = config.store_options().path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
    }

    info!(
        "event=bootstrap module=bootstrap status=ok store={} version={}",
        config.storage.store_name, config.storage.schema_version
    );
    Ok(())
}
