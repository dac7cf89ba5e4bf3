use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub telegram: TelegramConfig,
    pub channels: ChannelsConfig,
    /// Caption template applied after sanitization. `{caption}` is replaced
    /// with the cleaned caption, `{source}` with the source channel handle.
    /// Empty template forwards the cleaned caption unchanged.
    pub caption_template: String,
    pub dedup: DedupConfig,
    /// Delivery attempts allowed per minute.
    pub rate_limit_per_minute: u32,
    /// Bounded intake queue capacity; overflow is dropped (and counted).
    pub queue_capacity: usize,
    /// Number of concurrent pipeline workers.
    pub workers: usize,
    pub delivery: DeliveryConfig,
    pub store: StoreConfig,
    pub health: HealthConfig,
}

/// Telegram bot account settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// User ids allowed to issue admin commands in a private chat.
    pub admin_ids: Vec<i64>,

    /// Send a best-effort notice to the first admin on startup/shutdown.
    pub notify_admin: bool,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("admin_ids", &self.admin_ids)
            .finish_non_exhaustive()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            admin_ids: Vec::new(),
            notify_admin: true,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Source and target channel wiring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Chat ids of the channels media is accepted from.
    pub sources: Vec<i64>,
    /// Chat id of the single channel media is relayed to.
    pub target: i64,
}

/// Duplicate-detection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Derive the identity from a content hash instead of the transport's
    /// unique file id. Costs a download per message; off by default.
    pub use_hash: bool,
    /// Upper bound on payload bytes read for hashing.
    pub hash_max_bytes: u64,
    /// Forward anyway when the fingerprint store is unreachable. The default
    /// is fail-closed: never risk a duplicate that cannot be verified.
    pub fail_open: bool,
    /// Age after which an unfinalized claim is considered abandoned.
    pub provisional_grace_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            use_hash: false,
            hash_max_bytes: 64 * 1024 * 1024,
            fail_open: false,
            provisional_grace_secs: 600,
        }
    }
}

/// Outbound delivery tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after the first attempt on transient failures.
    pub max_retries: u32,
    /// Attach a downscaled preview thumbnail when the transport provides one.
    pub thumbnails: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            thumbnails: true,
        }
    }
}

/// Fingerprint store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path.
    pub path: std::path::PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: std::path::PathBuf::from("tgrelay.db"),
        }
    }
}

/// Health probe endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Listen address for `GET /health`. Empty disables the endpoint.
    pub bind: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            channels: ChannelsConfig::default(),
            caption_template: "{caption}".into(),
            dedup: DedupConfig::default(),
            rate_limit_per_minute: 20,
            queue_capacity: 256,
            workers: 4,
            delivery: DeliveryConfig::default(),
            store: StoreConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = RelayConfig::default();
        assert!(!cfg.dedup.use_hash);
        assert!(!cfg.dedup.fail_open);
        assert_eq!(cfg.caption_template, "{caption}");
        assert_eq!(cfg.rate_limit_per_minute, 20);
        assert!(cfg.workers >= 1);
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [channels]
            sources = [-1001, -1002]
            target = -1009

            [telegram]
            token = "123:ABC"
        "#;
        let cfg: RelayConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.channels.sources, vec![-1001, -1002]);
        assert_eq!(cfg.channels.target, -1009);
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
        // Unspecified sections fall back to defaults.
        assert_eq!(cfg.delivery.timeout_secs, 30);
        assert_eq!(cfg.dedup.provisional_grace_secs, 600);
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramConfig {
            token: Secret::new("hunter2".into()),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }
}
