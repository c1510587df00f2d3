//! Protection Policy
//!
//! Single entry point for traffic-filtering decisions, combining the
//! advertising and malware/phishing blocklists. Built once at process
//! start and shared via `Arc` — no ambient globals, no hidden
//! reinitialization.

use crate::blocklist::Blocklist;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Why a domain was blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Malware/phishing list hit (checked first, higher priority)
    MalwarePhishing,
    /// Advertising/tracking list hit
    Advertising,
}

/// Outcome of one policy check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Normalized (lowercased, trimmed) domain that was checked
    pub domain: String,
    pub blocked: bool,
    pub reason: Option<BlockReason>,
}

/// Entry counts and staleness for both lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionStats {
    pub adblock_domains: usize,
    pub malware_domains: usize,
    /// Seconds since each list's last successful refresh
    pub adblock_refresh_age_secs: Option<u64>,
    pub malware_refresh_age_secs: Option<u64>,
}

/// Shared policy-check service
pub struct Protection {
    adblock: Arc<Blocklist>,
    malware: Arc<Blocklist>,
}

impl Protection {
    pub fn new(adblock: Arc<Blocklist>, malware: Arc<Blocklist>) -> Self {
        Self { adblock, malware }
    }

    pub fn adblock(&self) -> &Arc<Blocklist> {
        &self.adblock
    }

    pub fn malware(&self) -> &Arc<Blocklist> {
        &self.malware
    }

    /// Check a domain against both lists, malware first
    pub fn check(&self, domain: &str) -> Verdict {
        let normalized = domain.trim().to_ascii_lowercase();

        if self.malware.contains(&normalized) {
            debug!("Blocked {} (malware/phishing)", normalized);
            return Verdict {
                domain: normalized,
                blocked: true,
                reason: Some(BlockReason::MalwarePhishing),
            };
        }
        if self.adblock.contains(&normalized) {
            debug!("Blocked {} (advertising)", normalized);
            return Verdict {
                domain: normalized,
                blocked: true,
                reason: Some(BlockReason::Advertising),
            };
        }
        Verdict {
            domain: normalized,
            blocked: false,
            reason: None,
        }
    }

    pub fn stats(&self) -> ProtectionStats {
        ProtectionStats {
            adblock_domains: self.adblock.len(),
            malware_domains: self.malware.len(),
            adblock_refresh_age_secs: self.adblock.last_refresh_age().map(|a| a.as_secs()),
            malware_refresh_age_secs: self.malware.last_refresh_age().map(|a| a.as_secs()),
        }
    }

    /// Which lists are due for a refresh; the scheduler hook
    pub fn refresh_due(&self) -> Vec<&Arc<Blocklist>> {
        let mut due = Vec::new();
        if self.adblock.needs_refresh() {
            due.push(&self.adblock);
        }
        if self.malware.needs_refresh() {
            due.push(&self.malware);
        }
        due
    }
}
