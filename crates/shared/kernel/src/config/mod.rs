use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "NSERIES";

const DEFAULT_CONFIG: &str = "nseries";

/// Custom error type for config loading.
#[nseries_derive::nseries_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration by layering a file with environment overrides.
///
/// 1. **Base File**: Loads settings from a file (`nseries.toml`, `nseries.json`, ...).
///    If no path is provided, it defaults to `"nseries"` in the working directory.
/// 2. **Environment Overrides**: Overlays values from variables prefixed with `NSERIES__`.
///    Nested structures use double underscores (`NSERIES__WORK_DATE` maps to `work_date`,
///    `NSERIES__LOGGING__LEVEL` to `logging.level`).
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file cannot be found, or if its content
/// (after overrides) does not match the structure of `T`.
///
/// # Example
/// ```rust
/// use nseries_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     work_date: Option<String>,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path =
        path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake),
        );

    info!(path = %effective_path.display(), "Loading configuration");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
