//! Dedup decision engine.
//!
//! Per identity the state machine is `Unseen → {Delivering, Duplicate}`: the
//! first claimant's provisional insert wins, everyone else sees a duplicate.
//! The store's conflict-free insert is the only synchronization point; no
//! lock is held across delivery I/O.

use std::sync::Arc;

use tracing::{debug, warn};

use tgrelay_store::{DeliveryRecord, FingerprintStore, MediaIdentity};

/// Outcome of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// This caller won the race and owns delivery of the identity.
    Deliver,
    /// Someone already holds the slot; the sighting was counted.
    Duplicate {
        /// Target message id of the prior delivery, when already finalized.
        prior_target: Option<i64>,
    },
    /// The store could not answer; policy decides what happens next.
    StoreDown,
}

pub struct DedupEngine {
    store: Arc<dyn FingerprintStore>,
}

impl DedupEngine {
    #[must_use]
    pub fn new(store: Arc<dyn FingerprintStore>) -> Self {
        Self { store }
    }

    /// Atomically claim `identity`, or record a suppressed sighting.
    pub async fn claim(
        &self,
        identity: &MediaIdentity,
        source_channel_id: i64,
        now_ms: i64,
        removed_links: i64,
    ) -> Decision {
        let provisional =
            DeliveryRecord::provisional(identity, source_channel_id, now_ms, removed_links);
        match self.store.insert_if_absent(identity, provisional).await {
            Ok(outcome) if outcome.inserted => Decision::Deliver,
            Ok(outcome) => {
                if let Err(e) = self.store.record_suppression(identity).await {
                    warn!(identity = %identity, error = %e, "failed to count suppression");
                }
                debug!(identity = %identity, "duplicate sighting suppressed");
                Decision::Duplicate {
                    prior_target: outcome.existing.and_then(|r| r.target_message_id),
                }
            },
            Err(e) => {
                warn!(identity = %identity, error = %e, "fingerprint store unavailable");
                Decision::StoreDown
            },
        }
    }

    /// Mark a claimed identity delivered.
    ///
    /// A failure here leaves the claim pending; the abandoned-claim sweep
    /// eventually frees it, after which the content can be delivered once
    /// more on its next sighting.
    pub async fn finalize(&self, identity: &MediaIdentity, target_message_id: i64) {
        if let Err(e) = self.store.finalize(identity, target_message_id).await {
            warn!(identity = %identity, error = %e, "failed to finalize delivery record");
        }
    }

    /// Release a claim after a failed delivery so a retry can win it again.
    pub async fn rollback(&self, identity: &MediaIdentity) {
        match self.store.remove_provisional(identity).await {
            Ok(true) => debug!(identity = %identity, "rolled back provisional claim"),
            Ok(false) => {},
            Err(e) => {
                warn!(identity = %identity, error = %e, "failed to roll back provisional claim");
            },
        }
    }

    pub async fn store_reachable(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use tgrelay_store::SqliteFingerprintStore;

    use super::*;

    fn identity() -> MediaIdentity {
        MediaIdentity::TransportUnique("AgADdup".into())
    }

    async fn engine() -> (DedupEngine, Arc<dyn FingerprintStore>) {
        let store: Arc<dyn FingerprintStore> =
            Arc::new(SqliteFingerprintStore::in_memory().await.unwrap());
        (DedupEngine::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn first_claim_delivers_second_is_duplicate() {
        let (engine, _store) = engine().await;
        let id = identity();

        assert_eq!(engine.claim(&id, -1, 1_000, 0).await, Decision::Deliver);
        assert_eq!(
            engine.claim(&id, -2, 1_001, 0).await,
            Decision::Duplicate { prior_target: None }
        );
    }

    #[tokio::test]
    async fn duplicate_after_finalize_reports_prior_target() {
        let (engine, _store) = engine().await;
        let id = identity();

        engine.claim(&id, -1, 1_000, 0).await;
        engine.finalize(&id, 777).await;

        assert_eq!(
            engine.claim(&id, -1, 1_002, 0).await,
            Decision::Duplicate {
                prior_target: Some(777)
            }
        );
    }

    #[tokio::test]
    async fn duplicate_sightings_are_counted() {
        let (engine, store) = engine().await;
        let id = identity();

        engine.claim(&id, -1, 1_000, 0).await;
        engine.claim(&id, -1, 1_001, 0).await;
        engine.claim(&id, -1, 1_002, 0).await;

        let record = store.lookup(&id).await.unwrap().unwrap();
        assert_eq!(record.suppression_count, 2);
    }

    #[tokio::test]
    async fn rollback_reopens_the_slot() {
        let (engine, _store) = engine().await;
        let id = identity();

        engine.claim(&id, -1, 1_000, 0).await;
        engine.rollback(&id).await;
        assert_eq!(engine.claim(&id, -1, 1_003, 0).await, Decision::Deliver);
    }
}
