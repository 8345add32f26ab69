//! # External Collaborator Contracts
//!
//! The core never performs I/O itself. Two trait objects are supplied at
//! engine build time:
//!
//! * [`ServiceBridge`]: the outbound-call collaborator behind the `sraix`
//!   tag. The call is opaque, potentially slow and potentially failing; the
//!   interpreter passes a caller-supplied timeout and holds no knowledge-base
//!   lock across the call. Failures are always recovered locally (fallback
//!   text or literal pass-through), never propagated.
//! * [`CategoryStore`]: durable storage for the persistence-marked learning
//!   tag. Failures are logged and do not abort the in-memory learning
//!   outcome.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::knowledge::Category;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("service call timed out after {0:?}")]
    Timeout(Duration),
    #[error("service {service} failed: {message}")]
    Service { service: String, message: String },
    #[error("no service named {0}")]
    UnknownService(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    #[error("persistence failed: {0}")]
    Store(String),
}

/// Outbound-call collaborator for the `sraix` tag.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceBridge: Send + Sync {
    /// Performs one synchronous outbound call. `content` is the fully
    /// evaluated tag body; `params` carries ancillary parameters drawn from
    /// tag attributes and configured session variables.
    fn call(
        &self,
        service: &str,
        content: &str,
        params: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<String, BridgeError>;
}

/// Durable storage collaborator for the `learnf` tag.
#[cfg_attr(test, mockall::automock)]
pub trait CategoryStore: Send + Sync {
    fn persist(&self, category: &Category) -> Result<(), PersistError>;
    fn remove(&self, category: &Category) -> Result<(), PersistError>;
}
