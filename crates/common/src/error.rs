//! Startup errors for the gateway's TOML configuration and secret files

use std::path::PathBuf;

use thiserror::Error;

/// Why the gateway refused its configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// A value was read but failed validation
    #[error("invalid gateway config: {0}")]
    Config(String),

    /// `client_secret_file` is set but could not be read
    #[error("cannot read client secret file {}: {source}", path.display())]
    SecretFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_field() {
        let err = Error::Config("client_id must not be empty".into());
        assert_eq!(
            err.to_string(),
            "invalid gateway config: client_id must not be empty"
        );
    }

    #[test]
    fn io_error_converts_via_question_mark() {
        fn read_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/x-oauth-gateway.toml")?)
        }

        let err = read_missing().unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got: {err:?}");
        assert!(err.to_string().starts_with("cannot read config file:"), "got: {err}");
    }

    #[test]
    fn secret_file_error_names_path_and_cause() {
        let err = Error::SecretFile {
            path: PathBuf::from("/run/secrets/x"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let message = err.to_string();
        assert!(message.contains("/run/secrets/x"), "got: {message}");
        assert!(message.contains("denied"), "got: {message}");
    }

    #[test]
    fn toml_error_converts() {
        let parsed: std::result::Result<toml::Table, _> = toml::from_str("[x\nclient_id = ");
        let err: Error = parsed.unwrap_err().into();
        assert!(
            err.to_string().starts_with("config file is not valid TOML:"),
            "got: {err}"
        );
    }
}
