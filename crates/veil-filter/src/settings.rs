//! Filter Settings
//!
//! Source URLs, refresh intervals, and snapshot locations for both
//! blocklists. Intervals and URLs are externally supplied; the defaults
//! mirror the StevenBlack hosts distribution.

use crate::blocklist::BlocklistConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const ADBLOCK_URL: &str = "https://raw.githubusercontent.com/StevenBlack/hosts/master/hosts";
const MALWARE_URL: &str =
    "https://raw.githubusercontent.com/StevenBlack/hosts/master/alternates/fakenews-gambling-porn-social/hosts";

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/veil")
}

fn default_adblock_url() -> String {
    ADBLOCK_URL.to_string()
}

fn default_malware_url() -> String {
    MALWARE_URL.to_string()
}

fn default_refresh_interval_secs() -> u64 {
    86_400
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

/// Settings for both blocklist instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Directory holding the snapshot files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_adblock_url")]
    pub adblock_url: String,
    #[serde(default = "default_malware_url")]
    pub malware_url: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl FilterSettings {
    /// Parse from TOML, filling defaults for absent fields
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn list_config(&self, name: &str, url: &str) -> BlocklistConfig {
        BlocklistConfig {
            name: name.to_string(),
            source_url: url.to_string(),
            snapshot_path: self.data_dir.join(format!("{name}_hosts.txt")),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    /// Configuration for the advertising/tracking list
    pub fn adblock_config(&self) -> BlocklistConfig {
        self.list_config("adblock", &self.adblock_url)
    }

    /// Configuration for the malware/phishing list
    pub fn malware_config(&self) -> BlocklistConfig {
        self.list_config("malware", &self.malware_url)
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            adblock_url: default_adblock_url(),
            malware_url: default_malware_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}
