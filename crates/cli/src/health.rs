//! Health probe endpoint: `GET /health` → 200 once the pipeline is ready
//! and the fingerprint store answers, 503 otherwise.

use std::sync::Arc;

use {
    axum::{Router, extract::State, http::StatusCode, routing::get},
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use tgrelay_pipeline::RelayPipeline;

pub fn router(pipeline: Arc<RelayPipeline>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(pipeline)
}

async fn health_handler(
    State(pipeline): State<Arc<RelayPipeline>>,
) -> (StatusCode, &'static str) {
    if pipeline.is_healthy().await {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    }
}

/// Serve the probe until cancellation.
pub async fn serve(
    bind: String,
    pipeline: Arc<RelayPipeline>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(%bind, "health endpoint listening");
    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        async_trait::async_trait,
        axum::{body::Body, http::Request},
        tower::ServiceExt,
    };

    use {
        tgrelay_common::types::{ChannelPost, MediaInfo},
        tgrelay_config::RelayConfig,
        tgrelay_pipeline::{DeliveryError, MediaDelivery, MediaSource, RuntimeState},
        tgrelay_store::{FingerprintStore, SqliteFingerprintStore},
    };

    use super::*;

    struct NoopDelivery;

    #[async_trait]
    impl MediaDelivery for NoopDelivery {
        async fn deliver(
            &self,
            _: &ChannelPost,
            _: &str,
            _: Option<Vec<u8>>,
        ) -> Result<i64, DeliveryError> {
            Ok(1)
        }
    }

    struct NoopMedia;

    #[async_trait]
    impl MediaSource for NoopMedia {
        async fn content_bytes(&self, _: &MediaInfo, _: u64) -> anyhow::Result<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn preview_bytes(&self, _: &MediaInfo) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    async fn pipeline() -> (Arc<RelayPipeline>, Arc<RuntimeState>) {
        let mut cfg = RelayConfig::default();
        cfg.channels.sources = vec![-1];
        cfg.channels.target = -2;
        let store: Arc<dyn FingerprintStore> =
            Arc::new(SqliteFingerprintStore::in_memory().await.unwrap());
        let state = Arc::new(RuntimeState::new());
        let pipeline = Arc::new(RelayPipeline::new(
            &cfg,
            store,
            Arc::new(NoopDelivery),
            Arc::new(NoopMedia),
            Arc::clone(&state),
        ));
        (pipeline, state)
    }

    #[tokio::test]
    async fn reports_unavailable_until_ready() {
        let (pipeline, state) = pipeline().await;
        let app = router(Arc::clone(&pipeline));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.mark_ready();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
