//! Host side of the worker lifecycle.
//!
//! A registration holds at most one installing, one waiting and one active
//! generation. New generations install, wait until the active one is gone
//! or they ask to skip waiting, then activate and claim the clients. The
//! generation being replaced keeps control of the clients until the new one
//! claims them.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::application::{
    clients::Clients,
    ports::{Caches, Network},
    worker::{ActivationReport, OfflineWorker, WorkerConfig, WorkerError},
};
use crate::cache::{rw_read, rw_write};
use crate::domain::{ControlMessage, WorkerId, WorkerState};

const SOURCE: &str = "application::registration";

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("worker {worker} failed to install")]
    Install {
        worker: WorkerId,
        #[source]
        source: WorkerError,
    },
    #[error("no worker is installed")]
    NoWorker,
}

/// Point-in-time view of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInfo {
    pub id: WorkerId,
    pub state: WorkerState,
    pub version: String,
}

#[derive(Debug, Clone)]
struct Generation {
    worker: Arc<OfflineWorker>,
    state: WorkerState,
}

impl Generation {
    fn new(worker: Arc<OfflineWorker>, state: WorkerState) -> Self {
        Self { worker, state }
    }

    fn info(&self) -> GenerationInfo {
        GenerationInfo {
            id: self.worker.id(),
            state: self.state,
            version: self.worker.version().to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Slots {
    installing: Option<Generation>,
    waiting: Option<Generation>,
    active: Option<Generation>,
    // Replaced active generation, still controlling until the new one claims.
    retiring: Option<Generation>,
    redundant: Option<Generation>,
}

impl Slots {
    fn retire(&mut self, mut generation: Generation, reason: &'static str) {
        generation.state = WorkerState::Redundant;
        info!(
            target = "satam_edge::registration",
            worker = %generation.worker.id(),
            reason,
            "worker is redundant"
        );
        self.redundant = Some(generation);
    }
}

pub struct WorkerRegistration {
    slots: RwLock<Slots>,
    // Serializes install and activation; fetches only take the slot lock.
    lifecycle: Mutex<()>,
    caches: Arc<dyn Caches>,
    network: Arc<dyn Network>,
    clients: Arc<Clients>,
}

impl WorkerRegistration {
    pub fn new(caches: Arc<dyn Caches>, network: Arc<dyn Network>) -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            lifecycle: Mutex::new(()),
            caches,
            network,
            clients: Arc::new(Clients::new()),
        }
    }

    pub fn caches(&self) -> &Arc<dyn Caches> {
        &self.caches
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn clients(&self) -> &Arc<Clients> {
        &self.clients
    }

    /// Install a new generation and, if nothing is active or it asked to
    /// skip waiting, activate it.
    pub async fn register(
        &self,
        config: WorkerConfig,
    ) -> Result<Arc<OfflineWorker>, RegistrationError> {
        let _lifecycle = self.lifecycle.lock().await;

        let worker = Arc::new(OfflineWorker::new(
            config,
            self.caches.clone(),
            self.network.clone(),
            self.clients.clone(),
        ));
        rw_write(&self.slots, SOURCE, "register").installing =
            Some(Generation::new(worker.clone(), WorkerState::Installing));

        if let Err(source) = worker.install().await {
            error!(
                target = "satam_edge::registration",
                worker = %worker.id(),
                error = %source,
                "worker install failed"
            );
            let mut slots = rw_write(&self.slots, SOURCE, "install_failed");
            if let Some(failed) = slots.installing.take() {
                slots.retire(failed, "install_failed");
            }
            return Err(RegistrationError::Install {
                worker: worker.id(),
                source,
            });
        }

        let has_active = {
            let mut slots = rw_write(&self.slots, SOURCE, "installed");
            slots.installing = None;
            if let Some(previous) = slots.waiting.take() {
                slots.retire(previous, "superseded_while_waiting");
            }
            slots.waiting = Some(Generation::new(worker.clone(), WorkerState::Installed));
            slots.active.is_some()
        };
        info!(
            target = "satam_edge::registration",
            worker = %worker.id(),
            "worker installed"
        );

        if worker.skip_waiting_requested() || !has_active {
            self.activate_waiting().await;
        }

        Ok(worker)
    }

    /// Promote the waiting generation, if any. Callers hold the lifecycle lock.
    async fn activate_waiting(&self) -> Option<ActivationReport> {
        let worker = {
            let mut slots = rw_write(&self.slots, SOURCE, "activate");
            let waiting = slots.waiting.take()?;
            slots.retiring = slots.active.take();
            let worker = waiting.worker.clone();
            slots.active = Some(Generation::new(waiting.worker, WorkerState::Activating));
            worker
        };

        let report = match worker.activate().await {
            Ok(report) => {
                info!(
                    target = "satam_edge::registration",
                    worker = %worker.id(),
                    kept = report.kept.len(),
                    deleted = report.deleted.len(),
                    failed = report.failed.len(),
                    "worker activated"
                );
                Some(report)
            }
            Err(err) => {
                warn!(
                    target = "satam_edge::registration",
                    worker = %worker.id(),
                    error = %err,
                    "worker activation failed; activated without claiming clients"
                );
                None
            }
        };

        let mut slots = rw_write(&self.slots, SOURCE, "activated");
        if let Some(previous) = slots.retiring.take() {
            // Without a claim nobody controls the clients any more.
            self.clients.release(previous.worker.id());
            slots.retire(previous, "replaced");
        }
        if let Some(active) = slots.active.as_mut()
            && active.worker.id() == worker.id()
        {
            active.state = WorkerState::Activated;
        }
        report
    }

    /// Deliver a control message to the waiting generation, or the active
    /// one when nothing waits. Returns the id of the worker that handled it.
    pub async fn post_message(
        &self,
        message: ControlMessage,
    ) -> Result<WorkerId, RegistrationError> {
        let (target, is_waiting) = {
            let slots = rw_read(&self.slots, SOURCE, "post_message");
            match (&slots.waiting, &slots.active) {
                (Some(waiting), _) => (waiting.worker.clone(), true),
                (None, Some(active)) => (active.worker.clone(), false),
                (None, None) => return Err(RegistrationError::NoWorker),
            }
        };

        debug!(
            target = "satam_edge::registration",
            worker = %target.id(),
            kind = ?message.kind(),
            waiting = is_waiting,
            "delivering control message"
        );
        target.handle_message(message).await;

        if is_waiting && target.skip_waiting_requested() {
            let _lifecycle = self.lifecycle.lock().await;
            let still_waiting = rw_read(&self.slots, SOURCE, "post_message")
                .waiting
                .as_ref()
                .is_some_and(|waiting| waiting.worker.id() == target.id());
            if still_waiting {
                self.activate_waiting().await;
            }
        }

        Ok(target.id())
    }

    /// The worker that routes fetches: the active generation, if it has
    /// claimed the clients.
    pub fn controller(&self) -> Option<Arc<OfflineWorker>> {
        let controller = self.clients.controller()?;
        let slots = rw_read(&self.slots, SOURCE, "controller");
        slots
            .active
            .iter()
            .chain(slots.retiring.iter())
            .find(|generation| generation.worker.id() == controller)
            .map(|generation| generation.worker.clone())
    }

    pub fn active(&self) -> Option<GenerationInfo> {
        rw_read(&self.slots, SOURCE, "active")
            .active
            .as_ref()
            .map(Generation::info)
    }

    pub fn waiting(&self) -> Option<GenerationInfo> {
        rw_read(&self.slots, SOURCE, "waiting")
            .waiting
            .as_ref()
            .map(Generation::info)
    }

    pub fn installing(&self) -> Option<GenerationInfo> {
        rw_read(&self.slots, SOURCE, "installing")
            .installing
            .as_ref()
            .map(Generation::info)
    }

    pub fn redundant(&self) -> Option<GenerationInfo> {
        rw_read(&self.slots, SOURCE, "redundant")
            .redundant
            .as_ref()
            .map(Generation::info)
    }
}
