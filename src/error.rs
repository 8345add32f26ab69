use thiserror::Error;

use crate::bridge::{BridgeError, PersistError};
use crate::engine::EngineError;
use crate::parser::ParseError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
    #[error("Persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
