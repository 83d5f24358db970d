use std::{
    fs::File,
    io::BufReader,
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Brand title used when neither the request nor the config supplies one.
pub const DEFAULT_TITLE: &str = "Current Market";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub og: OgConfig,
}

impl Config {
    /// Load the config from a YAML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()));
            }
        };
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 3000, request_timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OgConfig {
    /// Title rendered when the request carries none.
    pub default_title: String,
    /// Additional font files, loaded once at startup.
    pub fonts_dir: Option<PathBuf>,
    pub system_fonts: bool,
    pub font_family: String,
    /// Seconds for the `Cache-Control: max-age` directive.
    pub cache_max_age: u64,
    pub max_title_chars: usize,
}

impl Default for OgConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
            fonts_dir: None,
            system_fonts: true,
            font_family: "Inter".to_string(),
            cache_max_age: 86400,
            max_title_chars: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn test_partial_config() {
        let config: Config = serde_yaml::from_str(
            "server:\n  port: 8080\nog:\n  default_title: Studio\n  cache_max_age: 60\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.og.default_title, "Studio");
        assert_eq!(config.og.cache_max_age, 60);
        assert_eq!(config.og.font_family, "Inter");
        assert!(config.og.system_fonts);
        assert!(config.og.fonts_dir.is_none());
    }

    #[test]
    fn test_missing_file_defaults() {
        let config = Config::load("does-not-exist/config.yml").unwrap();
        assert_eq!(config.og.default_title, "Current Market");
        assert_eq!(config.og.max_title_chars, 120);
    }

    #[test]
    fn test_invalid_file_errors() {
        let path = std::env::temp_dir().join("current-market-invalid-config.yml");
        std::fs::write(&path, "server: [not, a, map]\n").unwrap();
        assert!(Config::load(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
