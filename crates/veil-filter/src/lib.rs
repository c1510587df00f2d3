//! Veil Filter - Traffic-Filtering Policy
//!
//! Maintains two refreshable domain blocklists (advertising/tracking
//! and malware/phishing) fed from hosts-format sources, and answers
//! suffix-membership policy checks against them.
//!
//! A lookup for `a.b.example.com` walks `a.b.example.com`,
//! `b.example.com`, `example.com`, `com` — so one blocklist entry for
//! a parent domain covers every subdomain, while lookalike hosts such
//! as `example.com.evil.com` stay unaffected.
//!
//! Refreshing swaps the in-memory set atomically and snapshots it to
//! disk; queries keep answering from the previous set whenever a
//! source fetch fails.

mod blocklist;
mod fetch;
mod policy;
mod settings;

pub use blocklist::{parse_hosts, Blocklist, BlocklistConfig, BlocklistError};
pub use fetch::{get_text, FetchError};
pub use policy::{BlockReason, Protection, ProtectionStats, Verdict};
pub use settings::FilterSettings;
