//! Environment variable names recognized by [`LoggerBuilder::from_env`].
//!
//! These are purely helpers; explicit builder calls made after
//! `from_env` still win.
//!
//! [`LoggerBuilder::from_env`]: crate::config::LoggerBuilder::from_env

/// Application name shown by `{app_name}`.
pub const WSLOG_APP_NAME_ENV: &str = "WSLOG_APP_NAME";

/// Output template, see [`crate::format`].
pub const WSLOG_FORMAT_ENV: &str = "WSLOG_FORMAT";

/// Emit JSON instead of templated text.
pub const WSLOG_JSON_ENV: &str = "WSLOG_JSON";

/// Enable or disable ANSI colors.
pub const WSLOG_COLOR_ENV: &str = "WSLOG_COLOR";

/// Conventional switch that turns colors off when set to anything.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Path of a rotating log file.
pub const WSLOG_FILE_ENV: &str = "WSLOG_FILE";

/// Rotation size limit in megabytes.
pub const WSLOG_MAX_SIZE_MB_ENV: &str = "WSLOG_MAX_SIZE_MB";

/// Number of rotated backups to keep.
pub const WSLOG_MAX_BACKUPS_ENV: &str = "WSLOG_MAX_BACKUPS";

/// Maximum backup age in days.
pub const WSLOG_MAX_AGE_DAYS_ENV: &str = "WSLOG_MAX_AGE_DAYS";

/// Compress rotated backups.
pub const WSLOG_COMPRESS_ENV: &str = "WSLOG_COMPRESS";

/// Non-empty value of an environment variable.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Boolean environment variable; unrecognized values count as unset.
pub fn env_flag(key: &str) -> Option<bool> {
    env_string(key).and_then(|v| parse_flag(&v))
}

pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
