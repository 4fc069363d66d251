use std::sync::RwLock;

use crate::cache::{rw_read, rw_write};
use crate::domain::WorkerId;

const SOURCE: &str = "application::clients";

/// The pages served by the edge, seen as one group with a single controller.
#[derive(Debug, Default)]
pub struct Clients {
    controller: RwLock<Option<WorkerId>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `worker` the controller of every client, replacing any previous one.
    pub fn claim(&self, worker: WorkerId) {
        *rw_write(&self.controller, SOURCE, "claim") = Some(worker);
    }

    pub fn controller(&self) -> Option<WorkerId> {
        *rw_read(&self.controller, SOURCE, "controller")
    }

    /// Drop control if `worker` still holds it.
    pub fn release(&self, worker: WorkerId) -> bool {
        let mut controller = rw_write(&self.controller, SOURCE, "release");
        if *controller == Some(worker) {
            *controller = None;
            true
        } else {
            false
        }
    }
}
