//! The MACI poll state machine.
//!
//! [`MaciState`] is the global sign-up registry and poll arena. Each
//! [`Poll`] owns a message accumulator, a snapshot of the state tree, one
//! ballot per state leaf, and the tally accumulator; its `publish`,
//! `process`, and `tally` operations mutate state deterministically and
//! emit circuit-input bundles for the witness-generation collaborator.

pub mod poll;
pub mod state;
pub mod witness;

pub use poll::{
    MaxValues, MessageSlot, Poll, ProcessMessagesInputs, TallyVotesInputs, TreeDepths,
    MESSAGE_PROCESSING_CIRCUIT, TALLY_CIRCUIT,
};
pub use state::{MaciState, STATE_TREE_DEPTH, STATE_TREE_SUBDEPTH};
pub use witness::{CircuitInputs, HashWitnessGenerator, Witness, WitnessGenerator};

use maci_accum::AccumError;
use maci_domainobjs::DomainError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreError {
    /// Sign-up beyond the state tree capacity.
    #[error("state tree is full")]
    StateTreeFull,
    /// Poll deployment over more sign-ups than its user limit.
    #[error("poll user limit exceeded")]
    TooManyUsers,
    /// Unknown poll id.
    #[error("no poll with id {0}")]
    PollNotFound(u64),
    /// Rejected poll configuration.
    #[error("invalid poll configuration: {0}")]
    BadPollConfig(&'static str),
    /// Publish beyond the poll's message limit.
    #[error("poll message limit reached")]
    TooManyMessages,
    /// Processing requires the message accumulator merged at the full
    /// message tree depth.
    #[error("message accumulator not merged at the message tree depth")]
    MessageTreeNotMerged,
    /// Tallying before every message batch has been applied.
    #[error("message processing is not complete")]
    ProcessingIncomplete,
    /// Accumulator capacity/sequencing failure surfaced to the caller.
    #[error(transparent)]
    Accum(#[from] AccumError),
    /// Domain-object failure surfaced to the caller.
    #[error(transparent)]
    Domain(#[from] DomainError),
}
