use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};

/// Handle to one live external process, held by the supervisor.
///
/// `terminate` requests best-effort termination and never blocks; a process
/// that ignores the signal is a documented leak risk, not retried.
pub trait ProcessHandle: Send + Sync {
    fn id(&self) -> u64;
    fn terminate(&self);
}

/// Signal side of a kill switch. Registered with the supervisor while the
/// process runs; the owning task holds the matching [`KillListener`].
pub struct KillSwitch {
    id: u64,
    tx: watch::Sender<bool>,
}

impl KillSwitch {
    pub fn new(id: u64) -> (Self, KillListener) {
        let (tx, rx) = watch::channel(false);
        (Self { id, tx }, KillListener { rx })
    }
}

impl ProcessHandle for KillSwitch {
    fn id(&self) -> u64 {
        self.id
    }

    fn terminate(&self) {
        self.tx.send_replace(true);
    }
}

/// Listener side of a kill switch, awaited by the task owning the child
pub struct KillListener {
    rx: watch::Receiver<bool>,
}

impl KillListener {
    /// Resolves when termination has been requested. If the switch is dropped
    /// without firing, this never resolves.
    pub async fn terminated(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Tracks live external-tool processes and offers atomic cancel-all.
///
/// Purely process bookkeeping: no job state lives here. The registry never
/// outlives a process's actual exit; every registration has a matching
/// unregistration on success, failure and kill.
#[derive(Default)]
pub struct ProcessSupervisor {
    registry: Mutex<HashMap<u64, Arc<dyn ProcessHandle>>>,
    next_id: AtomicU64,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh process id
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register(&self, handle: Arc<dyn ProcessHandle>) {
        let id = handle.id();
        debug!("Registering process {}", id);
        self.registry.lock().unwrap().insert(id, handle);
    }

    pub fn unregister(&self, id: u64) {
        if self.registry.lock().unwrap().remove(&id).is_some() {
            debug!("Unregistered process {}", id);
        }
    }

    /// Number of currently registered processes
    pub fn active_count(&self) -> usize {
        self.registry.lock().unwrap().len()
    }

    /// Signal termination to every registered process, clear the registry and
    /// return how many were signalled. Idempotent; a no-op on an empty
    /// registry.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Arc<dyn ProcessHandle>> = {
            let mut registry = self.registry.lock().unwrap();
            registry.drain().map(|(_, handle)| handle).collect()
        };

        for handle in &drained {
            handle.terminate();
        }

        if !drained.is_empty() {
            info!("Cancelled {} live process(es)", drained.len());
        }
        drained.len()
    }
}
