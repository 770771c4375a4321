//! Errors raised while reading, merging or writing dvgraph config files.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config file exists but could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid TOML or has a mistyped field
    #[error("{path} is not a valid dvgraph config: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot render config as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    /// Creating the config directory or writing the file failed
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no home directory, so there is no global config location")]
    NoHomeDir,

    /// The merged config holds a value dvgraph cannot use
    #[error("bad value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_names_key() {
        let err = ConfigError::InvalidValue {
            key: "storage.busy_timeout_ms",
            reason: "must be a number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "bad value for storage.busy_timeout_ms: must be a number"
        );
    }

    #[test]
    fn test_io_errors_name_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/dvgraph/config.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "cannot read /etc/dvgraph/config.toml: denied");
    }
}
