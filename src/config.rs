//! Configuration validation module
//!
//! Turns parsed command line arguments into the immutable [`ServeConfig`] shared by every
//! request, validating the served root on the way.

use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};

use crate::{
    args::CliArgs,
    errors::{ConfigValidationError, StartupError, log_validation_failure},
    resolve::ServerRoot,
};

/// Trait for validating configuration options
pub trait ConfigValidator {
    /// Validate all configuration rules and return detailed errors
    fn validate(&self, args: &CliArgs) -> Result<(), Vec<ConfigValidationError>>;

    /// Validate the served root directory
    fn validate_root(&self, path: &Path) -> Result<(), ConfigValidationError>;

    /// Validate upload buffering limits
    fn validate_memory_size(&self, size: usize) -> Result<(), ConfigValidationError>;
}

/// Implementation of configuration validation
pub struct ServeConfigValidator;

impl ConfigValidator for ServeConfigValidator {
    fn validate(&self, args: &CliArgs) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if let Some(ref dir) = args.dir {
            if let Err(err) = self.validate_root(dir) {
                errors.push(err);
            }
        }

        if let Err(err) = self.validate_memory_size(args.max_memory_size) {
            errors.push(err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_root(&self, path: &Path) -> Result<(), ConfigValidationError> {
        if !path.exists() {
            return Err(ConfigValidationError::PathError {
                path: path.display().to_string(),
                reason: "Directory does not exist".to_string(),
                suggestion: format!("Create the directory with: mkdir -p '{}'", path.display()),
            });
        }

        if !path.is_dir() {
            return Err(ConfigValidationError::PathError {
                path: path.display().to_string(),
                reason: "Path is not a directory".to_string(),
                suggestion: "Serve the directory containing the file instead".to_string(),
            });
        }

        Ok(())
    }

    fn validate_memory_size(&self, size: usize) -> Result<(), ConfigValidationError> {
        if size == 0 {
            return Err(ConfigValidationError::UploadError {
                reason: "Memory size must be greater than zero".to_string(),
                suggestion: "Use a value like --max-memory-size 100M".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Configuration of the server, immutable for the process lifetime
pub struct ServeConfig {
    /// Root every operation is confined to
    pub root: ServerRoot,

    /// Address the listener binds to
    pub host: IpAddr,

    /// Port the listener binds to
    pub port: u16,

    /// Upload bytes held in memory before spooling to disk, also the parameter body cap
    pub max_memory_size: usize,
}

impl ServeConfig {
    /// Parses the command line arguments with validation
    pub fn try_from_args(args: CliArgs) -> Result<Self> {
        let validator = ServeConfigValidator;
        if let Err(validation_errors) = validator.validate(&args) {
            for error in &validation_errors {
                log_validation_failure(error, "ServeConfig::try_from_args");
            }
            if let Some(first_error) = validation_errors.into_iter().next() {
                return Err(anyhow!(StartupError::ConfigValidationError(first_error)));
            }
        }

        let dir = match args.dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to get working directory")?,
        };
        let root = canonical_root(&dir)?;

        let port = match args.port {
            0 => port_check::free_local_port().context("No free ports available")?,
            _ => args.port,
        };

        Ok(Self {
            root: ServerRoot::new(root),
            host: args.host,
            port,
            max_memory_size: args.max_memory_size,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Absolute, symlink-free form of the root so containment checks compare like with like.
fn canonical_root(dir: &Path) -> Result<PathBuf> {
    let root = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory path {}", dir.display()))?;
    ServeConfigValidator
        .validate_root(&root)
        .map_err(|e| anyhow!(StartupError::ConfigValidationError(e)))?;
    Ok(root)
}

#[cfg(test)]
#[path = "config/tests.rs"]
mod tests;
