mod settings;

pub use settings::{Business, Config, CurrencySettings, PdfSettings, StockSettings};

use crate::error::{AcopioError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.acopio/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "acopio") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.acopio/
    let home = dirs_home().ok_or_else(|| {
        AcopioError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".acopio"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs_home() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Resolve the configured PDF output directory, relative paths land inside
/// the config dir.
pub fn resolve_output_dir(configured: &str, config_dir: &Path) -> PathBuf {
    let expanded = expand_path(configured);
    if expanded.is_absolute() {
        expanded
    } else {
        config_dir.join(expanded)
    }
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(AcopioError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| AcopioError::ConfigParse { path, source: e })
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[business]
name = "Your Collection Center"
# owner = "Full Name"           # optional
# phone = "+57-300-000-0000"    # optional

[currency]
symbol = "$"

[stock]
# Base units a "balde" is worth when a sale is priced per balde.
balde_units = 100

[pdf]
output_dir = "output"
"#;
