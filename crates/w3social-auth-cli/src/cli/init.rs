/*
[INPUT]:  Output path and optional data directory
[OUTPUT]: Generated YAML configuration file
[POS]:    CLI initialization layer
[UPDATE]: When ServiceConfig schema changes
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::config::ServiceConfig;

pub fn run_init(output: &Path, data_dir: Option<PathBuf>, force: bool) -> Result<ServiceConfig> {
    if output.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            output.display()
        );
    }

    let config = ServiceConfig::generate(data_dir);
    let yaml = config.to_yaml()?;

    std::fs::write(output, yaml)
        .with_context(|| format!("failed to write config to {}", output.display()))?;

    info!(
        path = %output.display(),
        data_dir = %config.storage.data_dir.display(),
        "configuration written"
    );
    Ok(config)
}
