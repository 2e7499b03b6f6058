mod demo;

use std::path::PathBuf;

use anyhow::{Context, Result};

use bastion_engine::config::BastionConfig;
use bastion_engine::logging::init_logging;
use bastion_engine::window::Runtime;

use demo::SiegeDemo;

fn main() -> Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bastion.toml"));
    let config = BastionConfig::load_or_default(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    init_logging(config.logging.to_logging_config());
    log::info!("starting bastion ({} bullet visuals configured)", config.bullets.visuals.len());

    Runtime::run(config.window.runtime_config(), config.window.gpu_init(), SiegeDemo::new(&config))
}
