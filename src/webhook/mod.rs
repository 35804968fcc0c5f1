//! The webhook core: verifies platform callbacks and drives meetings through
//! their lifecycle.

pub mod agent_connection;
pub mod assistant;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod signature;

pub use dispatcher::{Collaborators, ProcessorSettings, WebhookOutcome, WebhookProcessor};
pub use error::WebhookError;
pub use signature::SignatureVerifier;
