//! Worker behavior and the host-side lifecycle around it.

pub mod clients;
pub mod error;
pub mod patterns;
pub mod ports;
pub mod registration;
pub mod worker;

pub use clients::Clients;
pub use registration::{GenerationInfo, RegistrationError, WorkerRegistration};
pub use worker::{
    ActivationReport, FetchDisposition, FetchError, OfflineWorker, ResponseSource, Served,
    Strategy, WorkerConfig, WorkerError,
};
