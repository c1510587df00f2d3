//! Domain Blocklist
//!
//! A refreshable set of blocked domains fed from a hosts-format source
//! (`0.0.0.0 ads.example.com` per line). Membership is suffix-based:
//! an entry for `example.com` covers `ads.example.com` but never
//! `example.com.evil.com`.
//!
//! Refresh builds the replacement set off to the side and swaps it in
//! under one brief write lock, so lookups running concurrently always
//! see either the old or the new complete set. A failed refresh leaves
//! the previous set untouched: stale-but-available beats empty.

use crate::fetch::{self, FetchError};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Blocklist failures
#[derive(Debug, thiserror::Error)]
pub enum BlocklistError {
    #[error("Blocklist source unavailable: {0}")]
    SourceUnavailable(#[from] FetchError),

    #[error("Blocklist source yielded no domains")]
    EmptySource,
}

/// Configuration for one blocklist instance
#[derive(Debug, Clone)]
pub struct BlocklistConfig {
    /// Display name used in logs ("adblock", "malware")
    pub name: String,
    /// Hosts-format source URL
    pub source_url: String,
    /// Local snapshot file, reloaded after a process restart
    pub snapshot_path: PathBuf,
    /// Staleness threshold for `needs_refresh`
    pub refresh_interval: Duration,
    /// Hard deadline for one source fetch
    pub fetch_timeout: Duration,
}

/// Parse hosts-file text into a domain set.
///
/// Comments and blank lines are skipped; the domain is the second
/// whitespace-separated token (hosts format), falling back to the first
/// for bare-domain lists.
pub fn parse_hosts(text: &str) -> HashSet<String> {
    let mut domains = HashSet::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let first = fields.next();
        let domain = fields.next().or(first);
        if let Some(domain) = domain {
            if !domain.starts_with('#') {
                domains.insert(domain.to_ascii_lowercase());
            }
        }
    }
    domains
}

/// One refreshable blocklist
pub struct Blocklist {
    config: BlocklistConfig,
    domains: RwLock<HashSet<String>>,
    last_refresh: RwLock<Option<Instant>>,
}

impl Blocklist {
    pub fn new(config: BlocklistConfig) -> Self {
        Self {
            config,
            domains: RwLock::new(HashSet::new()),
            last_refresh: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Number of domains currently loaded
    pub fn len(&self) -> usize {
        self.domains.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time since the last successful refresh, if any
    pub fn last_refresh_age(&self) -> Option<Duration> {
        self.last_refresh
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .map(|t| t.elapsed())
    }

    /// True when the list has never been refreshed or has gone stale
    pub fn needs_refresh(&self) -> bool {
        match self.last_refresh_age() {
            None => true,
            Some(age) => age > self.config.refresh_interval,
        }
    }

    /// Fetch the source, rebuild the set, swap it in, snapshot it.
    ///
    /// Returns the new domain count. On any fetch or parse failure the
    /// in-memory set and refresh timestamp are left untouched.
    pub async fn refresh(&self) -> Result<usize, BlocklistError> {
        let text = fetch::get_text(&self.config.source_url, self.config.fetch_timeout).await?;

        let domains = parse_hosts(&text);
        if domains.is_empty() {
            return Err(BlocklistError::EmptySource);
        }
        let count = domains.len();

        self.write_snapshot(&domains);
        *self.domains.write().unwrap_or_else(|e| e.into_inner()) = domains;
        *self.last_refresh.write().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        info!("Refreshed {} blocklist: {} domains", self.config.name, count);
        Ok(count)
    }

    /// Snapshot persistence is best-effort; the in-memory set is the
    /// source of truth until the next restart.
    fn write_snapshot(&self, domains: &HashSet<String>) {
        let mut sorted: Vec<_> = domains.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let mut body = sorted.join("\n");
        body.push('\n');

        if let Some(parent) = self.config.snapshot_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create snapshot directory {:?}: {}", parent, e);
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.config.snapshot_path, body) {
            warn!(
                "Failed to write {} snapshot to {:?}: {}",
                self.config.name, self.config.snapshot_path, e
            );
        }
    }

    /// Load the last snapshot into memory. Covers process restart
    /// without forcing a network fetch; does not count as a refresh.
    pub fn load_snapshot(&self) -> bool {
        let text = match std::fs::read_to_string(&self.config.snapshot_path) {
            Ok(text) => text,
            Err(_) => return false,
        };
        let domains: HashSet<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if domains.is_empty() {
            return false;
        }

        debug!(
            "Loaded {} snapshot: {} domains from {:?}",
            self.config.name,
            domains.len(),
            self.config.snapshot_path
        );
        *self.domains.write().unwrap_or_else(|e| e.into_inner()) = domains;
        true
    }

    /// Replace the set directly from hosts text, bypassing the network
    #[cfg(test)]
    pub(crate) fn seed_for_tests(&self, hosts: &str) {
        *self.domains.write().unwrap() = parse_hosts(hosts);
    }

    /// True if `domain` or any parent domain is blocked.
    ///
    /// Lazily loads the snapshot when the set is empty, so a restarted
    /// process answers from disk before its first refresh.
    pub fn contains(&self, domain: &str) -> bool {
        if self.is_empty() {
            self.load_snapshot();
        }

        let normalized = domain.trim().to_ascii_lowercase();
        let domains = self.domains.read().unwrap_or_else(|e| e.into_inner());

        let mut rest = normalized.as_str();
        loop {
            if domains.contains(rest) {
                return true;
            }
            match rest.split_once('.') {
                Some((_, suffix)) if !suffix.is_empty() => rest = suffix,
                _ => return false,
            }
        }
    }
}
