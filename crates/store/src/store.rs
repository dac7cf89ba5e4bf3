use async_trait::async_trait;

use crate::{DeliveryRecord, MediaIdentity, Result};

/// Result of an insert-if-absent claim attempt.
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    /// True when this caller created the record and owns delivery.
    pub inserted: bool,
    /// The record that already held the slot, when the claim lost.
    ///
    /// May be `None` even when `inserted` is false: the winning row can have
    /// been rolled back between our conflicting insert and the re-read. The
    /// caller still treats the message as a duplicate for this pass.
    pub existing: Option<DeliveryRecord>,
}

/// Persistent storage for delivery records, keyed by media identity.
///
/// `insert_if_absent` must be atomic with respect to `lookup` for the same
/// identity; it is the linchpin guaranteeing at-most-one delivery per
/// identity under concurrent processing.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn lookup(&self, identity: &MediaIdentity) -> Result<Option<DeliveryRecord>>;

    /// Atomically claim an identity with a provisional record.
    async fn insert_if_absent(
        &self,
        identity: &MediaIdentity,
        provisional: DeliveryRecord,
    ) -> Result<InsertOutcome>;

    /// Mark a pending claim delivered, recording the target message id.
    async fn finalize(&self, identity: &MediaIdentity, target_message_id: i64) -> Result<()>;

    /// Roll back a pending claim so a later retry can deliver.
    ///
    /// Removes only a still-pending row; returns whether one was removed.
    async fn remove_provisional(&self, identity: &MediaIdentity) -> Result<bool>;

    /// Count one more suppressed duplicate sighting.
    async fn record_suppression(&self, identity: &MediaIdentity) -> Result<()>;

    /// Delete pending claims older than `cutoff_ms`, returning the count.
    ///
    /// Run at startup and periodically so a crash mid-delivery never blocks
    /// an identity forever.
    async fn purge_abandoned(&self, cutoff_ms: i64) -> Result<u64>;

    /// Wipe every record. Backs the admin `/cleardupes` command.
    async fn clear(&self) -> Result<u64>;

    /// Cheap reachability probe for the health surface.
    async fn ping(&self) -> Result<()>;
}
