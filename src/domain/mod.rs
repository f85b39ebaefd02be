//! Domain layer: credentials, work templates, worker connections, and the
//! connection registry.
//!
//! This is the session-continuity core of the gateway: everything the
//! connectionless getwork wire protocol fails to carry between requests
//! lives here.

pub mod credentials;
pub mod job_bus;
pub mod registry;
pub mod work;
pub mod worker_connection;

pub use credentials::{Credentials, CredentialsError};
pub use job_bus::JobBus;
pub use registry::ConnectionRegistry;
pub use work::WorkTemplate;
pub use worker_connection::{ConnectionSummary, WorkerConnection};
