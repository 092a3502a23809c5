use crate::timezone::{default_zones, ZoneOffset};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub intake: Intake,
    #[serde(default)]
    pub billing: Billing,
    #[serde(default)]
    pub display: Display,
    #[serde(default = "default_zones")]
    pub time_zones: Vec<ZoneOffset>,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product: Default::default(),
            intake: Default::default(),
            billing: Default::default(),
            display: Default::default(),
            time_zones: default_zones(),
            logging: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Broadcasts wait in `pending_test` until a test fax is approved.
    pub require_test_fax: bool,
}
impl Default for Product {
    fn default() -> Self {
        Self {
            require_test_fax: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intake {
    pub progress_step: u8,
    pub max_file_bytes: u64,
    pub accepted_extensions: Vec<String>,
}
impl Default for Intake {
    fn default() -> Self {
        Self {
            progress_step: 10,
            max_file_bytes: 10 * 1024 * 1024,
            accepted_extensions: vec!["pdf".into(), "doc".into(), "docx".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Billing {
    pub code_pattern: String,
}
impl Default for Billing {
    fn default() -> Self {
        Self {
            code_pattern: "^[A-Z0-9][A-Z0-9_-]{0,31}$".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Display {
    /// `time` format description used for full timestamps in notifications.
    pub time_format: String,
}
impl Default for Display {
    fn default() -> Self {
        Self {
            time_format:
                "[month repr:short] [day padding:none], [year] [hour repr:12 padding:none]:[minute] [period]"
                    .into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
