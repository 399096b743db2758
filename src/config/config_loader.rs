/// Configuration file loader for rs_tty
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{ConfigError, ServerConfig};

/// Configuration loader responsible for loading and parsing configuration files
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `./config.toml` is used when
    /// present and built-in defaults otherwise.
    pub fn load_config(&self, config_path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
        let config = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.display().to_string()));
                }
                self.load_config_from_file(path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    info!("Using default configuration file path: {:?}", path);
                    self.load_config_from_file(&path)?
                }
                _ => {
                    info!("No configuration file found, using built-in defaults");
                    ServerConfig::default()
                }
            },
        };

        validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    fn load_config_from_file(&self, path: &Path) -> Result<ServerConfig, ConfigError> {
        info!("Loading configuration from file: {:?}", path);

        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        self.parse_config(&contents)
    }

    /// Parse configuration from string content
    pub fn parse_config(&self, content: &str) -> Result<ServerConfig, ConfigError> {
        let config = toml::from_str::<ServerConfig>(content)?;
        info!("Configuration parsed successfully");
        Ok(config)
    }
}

fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.shell.command.trim().is_empty() {
        return Err(ConfigError::InvalidStructure(
            "shell.command must not be empty".to_string(),
        ));
    }
    if config.session.read_chunk_size == 0 {
        return Err(ConfigError::InvalidStructure(
            "session.read_chunk_size must be greater than zero".to_string(),
        ));
    }
    let size = config.shell.initial_size;
    if size.rows == 0 || size.cols == 0 {
        return Err(ConfigError::InvalidStructure(format!(
            "shell.initial_size must be non-zero, got {}x{}",
            size.rows, size.cols
        )));
    }
    Ok(())
}

/// Default configuration path
pub fn default_config_path() -> Option<PathBuf> {
    // 使用当前工作目录作为默认配置文件目录
    std::env::current_dir().ok().map(|dir| dir.join("config.toml"))
}
