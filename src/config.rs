//! Configuration
//!
//! One TOML file covering the delivery side of the tool: SMTP relay, mail
//! routing, attachment ceiling, business hours and the optional regional
//! defaults used when the registry lookup is down. Every field has a
//! default, so a missing file just means "defaults everywhere".

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::hours::BusinessHours;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub smtp: SmtpConfig,
    pub mail: MailConfig,
    pub limits: LimitsConfig,
    pub hours: HoursConfig,
    pub defaults: RegionDefaults,
}

/// SMTP relay settings. The host must be configured before `submit` can
/// deliver anything.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Mail routing. With an empty `to` list the submission goes back to the
/// company's own address.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "adesao@localhost".to_string(),
            to: Vec::new(),
            cc: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_attachment_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_attachment_mb: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HoursConfig {
    pub utc_offset_hours: i32,
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for HoursConfig {
    fn default() -> Self {
        let hours = BusinessHours::default();
        Self {
            utc_offset_hours: hours.utc_offset_hours,
            open_hour: hours.open_hour,
            close_hour: hours.close_hour,
        }
    }
}

impl HoursConfig {
    pub fn business_hours(&self) -> BusinessHours {
        BusinessHours {
            utc_offset_hours: self.utc_offset_hours,
            open_hour: self.open_hour,
            close_hour: self.close_hour,
        }
    }
}

/// City/state used as a last resort when every registry source fails.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegionDefaults {
    pub city: Option<String>,
    pub state: Option<String>,
}

impl Config {
    pub fn max_attachment_bytes(&self) -> u64 {
        self.limits.max_attachment_mb * 1024 * 1024
    }

    /// Load the configuration from an explicit path, or from
    /// `<config dir>/adesao/config.toml`. A missing file yields defaults; a
    /// present-but-broken file is an error the user has to see.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };

        if !path.exists() {
            debug!("no config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config file {:?}", path))
    }
}

fn default_config_path() -> Result<PathBuf> {
    let config_home =
        dir_spec::config_home().ok_or_else(|| anyhow!("could not determine config directory"))?;
    Ok(config_home.join("adesao").join("config.toml"))
}
