use std::error::Error;

#[derive(Debug)]
pub enum ConfigError {
    ConfigNotFound {
        path: String,
    },
    ConfigParseError {
        message: String,
    },
    InvalidPattern {
        pattern: String,
        message: String,
    },
    UnknownResourceClass {
        name: String,
        supported: String,
    },
    InvalidConfiguration {
        message: String,
    },
    IoError {
        source: std::io::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound { path } => {
                write!(f, "Config file not found at '{}'", path)
            }
            ConfigError::ConfigParseError { message } => {
                write!(f, "Failed to parse config file: {}", message)
            }
            ConfigError::InvalidPattern { pattern, message } => {
                write!(f, "Invalid name pattern '{}': {}", pattern, message)
            }
            ConfigError::UnknownResourceClass { name, supported } => {
                write!(
                    f,
                    "Unknown resource class '{}'. Supported classes: {}",
                    name, supported
                )
            }
            ConfigError::InvalidConfiguration { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            ConfigError::IoError { source } => {
                write!(f, "IO error reading config: {}", source)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::IoError { source } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(source: std::io::Error) -> Self {
        ConfigError::IoError { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_display() {
        let error = ConfigError::ConfigNotFound {
            path: "/tmp/missing.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Config file not found at '/tmp/missing.toml'"
        );
    }

    #[test]
    fn test_invalid_pattern_display() {
        let error = ConfigError::InvalidPattern {
            pattern: "tmp-[".to_string(),
            message: "invalid range pattern".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid name pattern 'tmp-[': invalid range pattern"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        let error: ConfigError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(error.source().is_some());
        assert!(error.to_string().contains("IO error reading config"));
    }
}
