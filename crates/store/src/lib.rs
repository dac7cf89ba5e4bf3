//! Fingerprint store: persistent mapping from a media identity to its
//! delivery record.
//!
//! `insert_if_absent` is the single linearization point the dedup engine
//! relies on: the backing SQLite table enforces uniqueness on the identity
//! key, so exactly one concurrent claimant wins.

pub mod error;
pub mod identity;
pub mod record;
pub mod sqlite;
pub mod store;

pub use {
    error::{Error, Result},
    identity::MediaIdentity,
    record::{DeliveryRecord, DeliveryStatus},
    sqlite::SqliteFingerprintStore,
    store::{FingerprintStore, InsertOutcome},
};
