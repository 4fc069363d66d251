//! Domain layer types exchanged between the edge host and the worker.

pub mod fetch;
pub mod lifecycle;
pub mod message;

pub use fetch::{FetchRequest, FetchResponse};
pub use lifecycle::{WorkerId, WorkerState};
pub use message::ControlMessage;
