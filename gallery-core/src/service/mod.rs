// gallery-core/src/service/mod.rs
//! The operation queue: submissions are handed to a single background worker
//! that applies them one at a time and records their status by id.

mod applier;
mod status;
mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use gallery_common::error::{GalleryError, Result};
use gallery_common::operation::{GalleryOp, InstallRequest, OpKind, OpStatus, OpTarget};
use gallery_common::Config;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

pub use applier::default_handler;
pub use status::StatusTable;
use worker::{run_worker, CancelFlags, QueuedOp};

/// Executes one operation. Errors end up verbatim in the operation's status.
pub type OpHandler =
    Arc<dyn Fn(GalleryOp, OpContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Handed to the handler of a running operation.
#[derive(Clone)]
pub struct OpContext {
    id: String,
    cancel: Arc<AtomicBool>,
    statuses: Arc<StatusTable>,
}

impl OpContext {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn report_progress(&self, file_name: &str, status: &str, percent: f64) {
        let message = format!("Downloading {file_name}: {status}");
        self.statuses
            .update_progress(&self.id, file_name, &message, percent);
    }
}

#[derive(Clone)]
pub struct GalleryService {
    tx: mpsc::UnboundedSender<QueuedOp>,
    statuses: Arc<StatusTable>,
    cancels: CancelFlags,
}

impl GalleryService {
    /// Spawns the worker on the current tokio runtime with the handler that
    /// installs and deletes models and backends.
    pub fn start(config: Arc<Config>, client: Client) -> (Self, JoinHandle<()>) {
        let retention = config.status_retention;
        Self::with_handler(default_handler(config, client), retention)
    }

    pub fn with_handler(handler: OpHandler, retention: Option<Duration>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let statuses = Arc::new(StatusTable::new(retention));
        let cancels: CancelFlags = Arc::new(Mutex::new(HashMap::new()));
        let worker = tokio::spawn(run_worker(
            rx,
            Arc::clone(&statuses),
            Arc::clone(&cancels),
            handler,
        ));
        (
            Self {
                tx,
                statuses,
                cancels,
            },
            worker,
        )
    }

    /// Queues an operation and returns its id. No status exists for the id
    /// until the worker picks it up.
    pub fn submit(
        &self,
        kind: OpKind,
        target: OpTarget,
        target_id: impl Into<String>,
        request: InstallRequest,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let op = GalleryOp {
            id: id.clone(),
            kind,
            target,
            target_id: target_id.into(),
            request,
        };
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flags().insert(id.clone(), Arc::clone(&cancel));
        debug!("[{}] Queueing {:?} of {:?} '{}'", id, kind, target, op.target_id);
        if self.tx.send(QueuedOp { op, cancel }).is_err() {
            self.cancel_flags().remove(&id);
            return Err(GalleryError::Generic(
                "operation queue is closed".to_string(),
            ));
        }
        Ok(id)
    }

    pub fn status(&self, id: &str) -> Option<OpStatus> {
        self.statuses.get(id)
    }

    pub fn all_status(&self) -> HashMap<String, OpStatus> {
        self.statuses.snapshot()
    }

    /// Requests cancellation of a queued or running operation. Returns `false`
    /// when the id is unknown or already finished.
    pub fn cancel(&self, id: &str) -> bool {
        match self.cancel_flags().get(id) {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                debug!("[{}] Cancellation requested", id);
                true
            }
            None => false,
        }
    }

    fn cancel_flags(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AtomicBool>>> {
        self.cancels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
