mod config;

pub use config::{ChartConfig, Config, SchedulerSettings, SliderConfig};

use std::path::PathBuf;

use crate::error::CoreError;

/// Returns the configuration directory, creating it if needed.
///
/// `RECALLCURVE_CONFIG_DIR` overrides the location outright. Otherwise this
/// is `~/.config/recallcurve[-dev]/`, with the `-dev` suffix selected by
/// `RECALLCURVE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let dir = match std::env::var_os("RECALLCURVE_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("RECALLCURVE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("recallcurve-dev")
            } else {
                base_dir.join("recallcurve")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
