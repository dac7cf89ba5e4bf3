//! Bounded intake queue and the fixed worker pool that drains it.
//!
//! Platform push events land here via [`RelayHandle::submit`]; overflow is
//! dropped with the rate-limited counter bumped, never silently. On
//! cancellation workers finish the post they hold and stop picking new work.

use std::sync::Arc;

use {
    tokio::{
        sync::{Mutex, mpsc, mpsc::error::TrySendError},
        task::JoinHandle,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use tgrelay_common::types::ChannelPost;

use crate::{pipeline::RelayPipeline, runtime::RuntimeState};

/// Intake handle given to the channel adapter.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<ChannelPost>,
    state: Arc<RuntimeState>,
}

impl RelayHandle {
    /// Enqueue a post for processing. Returns false when the post was
    /// dropped (queue full or pipeline stopped).
    pub fn submit(&self, post: ChannelPost) -> bool {
        match self.tx.try_send(post) {
            Ok(()) => true,
            Err(TrySendError::Full(post)) => {
                self.state.note_rate_limited();
                warn!(
                    source = post.source,
                    message_id = post.message_id,
                    "intake queue full, dropping post"
                );
                false
            },
            Err(TrySendError::Closed(post)) => {
                warn!(
                    source = post.source,
                    message_id = post.message_id,
                    "pipeline stopped, dropping post"
                );
                false
            },
        }
    }
}

/// Spawn the worker pool. Returns the intake handle and the worker tasks so
/// the caller can await a clean drain on shutdown.
#[must_use]
pub fn start_workers(
    pipeline: Arc<RelayPipeline>,
    queue_capacity: usize,
    workers: usize,
    cancel: CancellationToken,
) -> (RelayHandle, Vec<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel(queue_capacity);
    let rx = Arc::new(Mutex::new(rx));

    let handles = (0..workers)
        .map(|worker| {
            tokio::spawn(worker_loop(
                worker,
                Arc::clone(&pipeline),
                Arc::clone(&rx),
                cancel.clone(),
            ))
        })
        .collect();

    let handle = RelayHandle {
        tx,
        state: pipeline.state(),
    };
    (handle, handles)
}

async fn worker_loop(
    worker: usize,
    pipeline: Arc<RelayPipeline>,
    rx: Arc<Mutex<mpsc::Receiver<ChannelPost>>>,
    cancel: CancellationToken,
) {
    loop {
        // The receiver lock is held only while waiting for the next post,
        // never across processing.
        let post = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => None,
                post = rx.recv() => post,
            }
        };
        let Some(post) = post else { break };

        let outcome = pipeline.process(&post).await;
        debug!(
            worker,
            source = post.source,
            message_id = post.message_id,
            ?outcome,
            "post processed"
        );
    }
    info!(worker, "pipeline worker stopped");
}
