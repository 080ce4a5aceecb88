// gallery-core/src/service/worker.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use gallery_common::error::GalleryError;
use gallery_common::operation::{GalleryOp, OpStatus};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, instrument, warn};

use super::status::StatusTable;
use super::{OpContext, OpHandler};

pub(crate) type CancelFlags = Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>;

pub(crate) struct QueuedOp {
    pub op: GalleryOp,
    pub cancel: Arc<AtomicBool>,
}

pub(crate) fn get_panic_message(e: Box<dyn std::any::Any + Send>) -> String {
    match e.downcast_ref::<&'static str>() {
        Some(s) => (*s).to_string(),
        None => match e.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => "Unknown panic payload".to_string(),
        },
    }
}

/// Drains the queue one operation at a time, in submission order, until every
/// sender is gone.
#[instrument(skip_all, name = "gallery_worker")]
pub(crate) async fn run_worker(
    mut rx: UnboundedReceiver<QueuedOp>,
    statuses: Arc<StatusTable>,
    cancels: CancelFlags,
    handler: OpHandler,
) {
    debug!("Gallery worker started.");
    while let Some(QueuedOp { op, cancel }) = rx.recv().await {
        let id = op.id.clone();
        debug!("[{}] Dequeued {:?} of '{}'", id, op.kind, op.target_id);
        statuses.set(&id, OpStatus::processing());

        let terminal = if cancel.load(Ordering::Relaxed) {
            info!("[{}] Cancelled before it started", id);
            OpStatus::cancelled()
        } else {
            let ctx = OpContext {
                id: id.clone(),
                cancel: Arc::clone(&cancel),
                statuses: Arc::clone(&statuses),
            };
            // Own task so a panicking handler cannot take the worker down.
            match tokio::spawn((handler)(op, ctx)).await {
                Ok(Ok(())) => {
                    info!("[{}] Operation completed", id);
                    OpStatus::completed()
                }
                Ok(Err(GalleryError::Cancelled)) => {
                    info!("[{}] Operation cancelled", id);
                    OpStatus::cancelled()
                }
                Ok(Err(e)) => {
                    error!("[{}] Operation failed: {}", id, e);
                    OpStatus::failed(&e)
                }
                Err(join_err) if join_err.is_panic() => {
                    let message = get_panic_message(join_err.into_panic());
                    error!("[{}] Operation panicked: {}", id, message);
                    OpStatus::failed_with_message(format!("operation panicked: {message}"))
                }
                Err(join_err) => {
                    warn!("[{}] Operation task aborted: {}", id, join_err);
                    OpStatus::failed_with_message(join_err.to_string())
                }
            }
        };
        cancels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id);
        statuses.set(&id, terminal);
    }
    debug!("Gallery worker stopped, queue closed.");
}
