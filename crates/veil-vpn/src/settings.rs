//! Provisioning Settings
//!
//! Externally supplied limits the core honors but never hardcodes.

use serde::{Deserialize, Serialize};

fn default_max_configs() -> u32 {
    5
}

fn default_dns() -> String {
    "1.1.1.1,1.0.0.1".to_string()
}

/// Quota and default-DNS settings, loadable from a TOML document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpnSettings {
    /// Per-user configuration quota
    #[serde(default = "default_max_configs")]
    pub max_configs_per_user: u32,
    /// DNS servers used when a create request does not specify any
    #[serde(default = "default_dns")]
    pub default_dns_servers: String,
}

impl VpnSettings {
    /// Parse from TOML, filling defaults for absent fields
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl Default for VpnSettings {
    fn default() -> Self {
        Self {
            max_configs_per_user: default_max_configs(),
            default_dns_servers: default_dns(),
        }
    }
}
