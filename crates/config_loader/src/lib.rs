//! Dashboard configuration files
//!
//! A `fleetview.toml` (or `.json`) describes the map, the route catalog,
//! the initial status filters, the fleet data sources and the view sinks.
//! Loading parses the file by extension and then checks it as a whole
//! (unique route and sink names, waypoint coordinates in range, a usable
//! source) before any component sees it.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("fleetview.toml")).unwrap();
//! println!("Routes: {}", config.routes.len());
//! ```

mod parser;
mod validator;

pub use contracts::DashboardConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry points for reading and checking a [`DashboardConfig`]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a config file
    ///
    /// The extension picks the format (`.toml` or `.json`, any case).
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `ConfigParse` for an unknown
    /// extension or malformed content, `ConfigValidation` if the parsed
    /// config is inconsistent.
    pub fn load_from_path(path: &Path) -> Result<DashboardConfig, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!("{} has no file extension", path.display()))
        })?;
        let format = ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })?;
        let text = std::fs::read_to_string(path)?;
        Self::load_from_str(&text, format)
    }

    /// Parse and validate config text already in memory
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DashboardConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Re-check a config after command-line overrides were applied
    pub fn validate(config: &DashboardConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }
}
