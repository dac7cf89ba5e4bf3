use serde::{Deserialize, Serialize};

/// Lifecycle of a stored delivery record.
///
/// `Pending` rows are provisional claims taken before delivery completes;
/// they are finalized to `Delivered` or removed on rollback. Suppression of
/// duplicate sightings is a counter on the record, not a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
}

impl DeliveryStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }
}

/// Delivery metadata for one media identity. Owned exclusively by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    /// Identity key (see [`crate::MediaIdentity::as_key`]).
    pub identity: String,
    pub source_channel_id: i64,
    /// Unix milliseconds of the first sighting.
    pub first_seen_at: i64,
    /// Message id in the target channel, set when delivery is finalized.
    pub target_message_id: Option<i64>,
    pub status: DeliveryStatus,
    /// Duplicate sightings suppressed after the first delivery claim.
    pub suppression_count: i64,
    /// URLs stripped from the caption that was forwarded.
    pub removed_links: i64,
}

impl DeliveryRecord {
    /// Build the provisional record inserted when claiming an identity.
    #[must_use]
    pub fn provisional(
        identity: &crate::MediaIdentity,
        source_channel_id: i64,
        first_seen_at: i64,
        removed_links: i64,
    ) -> Self {
        Self {
            identity: identity.as_key(),
            source_channel_id,
            first_seen_at,
            target_message_id: None,
            status: DeliveryStatus::Pending,
            suppression_count: 0,
            removed_links,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::MediaIdentity};

    #[test]
    fn status_round_trips() {
        for status in [DeliveryStatus::Pending, DeliveryStatus::Delivered] {
            assert_eq!(DeliveryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeliveryStatus::parse("suppressed"), None);
    }

    #[test]
    fn provisional_record_shape() {
        let identity = MediaIdentity::TransportUnique("AgAD".into());
        let record = DeliveryRecord::provisional(&identity, -100, 1_700_000_000_000, 2);
        assert_eq!(record.identity, "uid:AgAD");
        assert_eq!(record.status, DeliveryStatus::Pending);
        assert_eq!(record.target_message_id, None);
        assert_eq!(record.suppression_count, 0);
        assert_eq!(record.removed_links, 2);
    }
}
