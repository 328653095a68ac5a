//! Tests for configuration validation
//!
//! Covers the validator rules and the conversion from CLI arguments into [`ServeConfig`].

use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

use crate::{
    args::{CliArgs, DEFAULT_MAX_MEMORY_SIZE},
    config::{ConfigValidator, ServeConfig, ServeConfigValidator},
    errors::ConfigValidationError,
};

/// Helper function to create a basic CliArgs with defaults
fn create_default_args() -> CliArgs {
    CliArgs {
        verbose: false,
        dir: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 9527,
        max_memory_size: DEFAULT_MAX_MEMORY_SIZE,
    }
}

mod root_validation_tests {
    use super::*;

    #[test]
    fn test_validate_root_nonexistent_path() {
        let validator = ServeConfigValidator;
        let result = validator.validate_root(&PathBuf::from("/nonexistent/path"));

        match result {
            Err(ConfigValidationError::PathError {
                path,
                reason,
                suggestion,
            }) => {
                assert!(path.contains("nonexistent"));
                assert_eq!(reason, "Directory does not exist");
                assert!(suggestion.contains("mkdir -p"));
            }
            _ => panic!("Expected PathError for nonexistent path"),
        }
    }

    #[test]
    fn test_validate_root_file_path() {
        let validator = ServeConfigValidator;
        let file = NamedTempFile::new().unwrap();

        match validator.validate_root(file.path()) {
            Err(ConfigValidationError::PathError { reason, .. }) => {
                assert_eq!(reason, "Path is not a directory");
            }
            _ => panic!("Expected PathError for file path"),
        }
    }

    #[test]
    fn test_validate_root_existing_directory() {
        let validator = ServeConfigValidator;
        let temp_dir = TempDir::new().unwrap();

        assert!(validator.validate_root(temp_dir.path()).is_ok());
    }
}

mod memory_size_validation_tests {
    use super::*;

    #[test]
    fn test_validate_memory_size_zero() {
        let validator = ServeConfigValidator;
        assert!(matches!(
            validator.validate_memory_size(0),
            Err(ConfigValidationError::UploadError { .. })
        ));
    }

    #[test]
    fn test_validate_memory_size_positive() {
        let validator = ServeConfigValidator;
        assert!(validator.validate_memory_size(1).is_ok());
    }
}

mod combined_validation_tests {
    use super::*;

    #[test]
    fn test_validate_collects_all_errors() {
        let validator = ServeConfigValidator;
        let mut args = create_default_args();
        args.dir = Some(PathBuf::from("/nonexistent/path"));
        args.max_memory_size = 0;

        match validator.validate(&args) {
            Err(errors) => assert_eq!(errors.len(), 2),
            Ok(()) => panic!("Expected validation errors"),
        }
    }

    #[test]
    fn test_validate_defaults_success() {
        let validator = ServeConfigValidator;
        assert!(validator.validate(&create_default_args()).is_ok());
    }
}

mod config_conversion_tests {
    use super::*;

    #[test]
    fn test_try_from_args_canonicalizes_root() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("inner")).unwrap();

        let mut args = create_default_args();
        args.dir = Some(temp_dir.path().join("inner/../inner"));

        let config = ServeConfig::try_from_args(args).unwrap();
        assert_eq!(
            config.root.path(),
            temp_dir.path().join("inner").canonicalize().unwrap()
        );
        assert!(config.root.path().is_absolute());
    }

    #[test]
    fn test_try_from_args_rejects_missing_root() {
        let mut args = create_default_args();
        args.dir = Some(PathBuf::from("/nonexistent/path"));

        let err = ServeConfig::try_from_args(args).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/path"));
    }

    #[test]
    fn test_try_from_args_rejects_file_root() {
        let file = NamedTempFile::new().unwrap();
        let mut args = create_default_args();
        args.dir = Some(file.path().to_path_buf());

        assert!(ServeConfig::try_from_args(args).is_err());
    }

    #[test]
    fn test_try_from_args_picks_free_port() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = create_default_args();
        args.dir = Some(temp_dir.path().to_path_buf());
        args.port = 0;

        let config = ServeConfig::try_from_args(args).unwrap();
        assert_ne!(config.port, 0);
        assert_eq!(config.socket_addr().port(), config.port);
    }

    #[test]
    fn test_try_from_args_defaults_to_current_dir() {
        let config = ServeConfig::try_from_args(create_default_args()).unwrap();
        assert_eq!(
            config.root.path(),
            std::env::current_dir().unwrap().canonicalize().unwrap()
        );
    }
}
