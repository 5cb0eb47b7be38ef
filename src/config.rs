//! Service configuration, read once from the environment at startup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::upload::UploadPolicy;

/// Application-level constants
pub const APP_NAME: &str = "idextract";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_SCRIPT: &str = "ocr_scripts/pdf_aadhar_ocr.py";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "idextract_lib=info,tower_http=info"
}

/// Upload directory used when `UPLOAD_DIR` is unset.
pub fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join("idextract-uploads")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Upload directory {path} is not usable: {source}")]
    UploadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub interpreter: String,
    pub script: PathBuf,
    pub timeout: Duration,
    pub max_upload_bytes: u64,
    /// Enforce image/PDF validation server-side.
    pub strict_file_types: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            upload_dir: default_upload_dir(),
            interpreter: DEFAULT_INTERPRETER.into(),
            script: PathBuf::from(DEFAULT_SCRIPT),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            strict_file_types: true,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables
    /// take their defaults; malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = parse_value("BIND_ADDR", v)?;
        }
        if let Some(v) = get("PORT") {
            config.port = parse_value("PORT", v)?;
        }
        if let Some(v) = get("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = get("EXTRACTOR_INTERPRETER") {
            config.interpreter = v;
        }
        if let Some(v) = get("EXTRACTOR_SCRIPT") {
            config.script = PathBuf::from(v);
        }
        if let Some(v) = get("EXTRACTOR_TIMEOUT_MS") {
            let ms: u64 = parse_value("EXTRACTOR_TIMEOUT_MS", v.clone())?;
            if ms == 0 {
                return Err(invalid("EXTRACTOR_TIMEOUT_MS", v, "must be positive"));
            }
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(v) = get("MAX_UPLOAD_BYTES") {
            let bytes: u64 = parse_value("MAX_UPLOAD_BYTES", v.clone())?;
            if bytes == 0 {
                return Err(invalid("MAX_UPLOAD_BYTES", v, "must be positive"));
            }
            config.max_upload_bytes = bytes;
        }
        if let Some(v) = get("STRICT_FILE_TYPES") {
            config.strict_file_types = parse_flag("STRICT_FILE_TYPES", v)?;
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            upload_dir: self.upload_dir.clone(),
            max_file_bytes: self.max_upload_bytes,
            strict_types: self.strict_file_types,
        }
    }

    /// Create the upload directory if needed, make its path absolute, and
    /// prove it is writable. Must succeed before the server accepts work.
    pub fn prepare_upload_dir(&mut self) -> Result<(), ConfigError> {
        let dir_error = |path: &PathBuf, source| ConfigError::UploadDir {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.upload_dir).map_err(|e| dir_error(&self.upload_dir, e))?;
        self.upload_dir =
            std::fs::canonicalize(&self.upload_dir).map_err(|e| dir_error(&self.upload_dir, e))?;

        let probe = tempfile::Builder::new()
            .prefix(".write-probe-")
            .tempfile_in(&self.upload_dir)
            .map_err(|e| dir_error(&self.upload_dir, e))?;
        probe.close().map_err(|e| dir_error(&self.upload_dir, e))?;

        if !self.strict_file_types {
            tracing::warn!("STRICT_FILE_TYPES=false: uploads of any file type are accepted");
        }
        tracing::info!(dir = %self.upload_dir.display(), "Upload directory ready");
        Ok(())
    }
}

fn parse_value<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| invalid(var, value.clone(), &e.to_string()))
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}

fn invalid(var: &'static str, value: String, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value,
        reason: reason.to_string(),
    }
}
