use thiserror::Error;

use crate::{storage::StorageError, transport::TransportError};

/// Errors that abort an MPC run.
#[derive(Debug, Error)]
pub enum MpcError {
    #[error("preprocessed {category} no. {index} is not available")]
    PreprocessingExhausted { category: String, index: usize },
    #[error("preprocessing storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("MAC check failed for a batch of {openings} opened values")]
    MacCheckFailed { openings: usize },
    #[error("party {0} opened a value that does not match its commitment")]
    CommitmentMismatch(usize),
    #[error("unexpected message from party {0}")]
    UnexpectedMessage(usize),
    #[error("there was an error in the network: {0}")]
    Transport(#[from] TransportError),
    #[error("message serialization failed: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("no message from party {0} in current round")]
    MissingMessage(usize),
    #[error("party {0} does not participate in this run")]
    UnknownParty(usize),
    #[error("input value of party {0} was not provided")]
    MissingInput(usize),
    #[error("wire {0} was read before being computed")]
    UnresolvedWire(usize),
    #[error("public wire {0} has no value for this party")]
    WithheldValue(usize),
    #[error("preprocessed data was generated for a different field")]
    ModulusMismatch,
}
