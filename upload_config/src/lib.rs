pub mod groups;
pub mod macros;
mod upload_config;

// Re-exported for use inside config_group!
pub use utils::configuration_utils::ParsableConfigValue;
pub use upload_config::UploadConfig;

/// Prefix shared by every environment override, e.g. `VAULT_UPLOAD_UPLOAD_MAX_CONCURRENT_UPLOADS`.
pub const ENV_PREFIX: &str = "VAULT_UPLOAD";
