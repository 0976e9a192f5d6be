//! The global sign-up registry and poll arena.

use maci_accum::{capacity, AccQueue, AccumError};
use maci_crypto::Fr;
use maci_domainobjs::{Keypair, PubKey, StateLeaf, VerifyingKey};

use crate::poll::{MaxValues, Poll, TreeDepths};
use crate::CoreError;

/// Depth of the global state tree.
pub const STATE_TREE_DEPTH: usize = 10;
/// Subtree depth of the sign-up accumulator queue.
pub const STATE_TREE_SUBDEPTH: usize = 2;

/// Single source of truth for voter identities: the sign-up accumulator and
/// every deployed poll. Poll ids are assigned sequentially and never reused.
#[derive(Clone, Debug)]
pub struct MaciState {
    /// Sign-up accumulator; one append per sign-up.
    pub state_aq: AccQueue,
    state_leaves: Vec<StateLeaf>,
    polls: Vec<Poll>,
}

impl MaciState {
    /// A fresh registry holding only the reserved blank leaf at index 0.
    pub fn new() -> Self {
        let mut state_aq = AccQueue::new(STATE_TREE_SUBDEPTH, STATE_TREE_DEPTH)
            .expect("state tree constants are within accumulator bounds");
        let blank = StateLeaf::blank();
        state_aq
            .insert(blank.hash())
            .expect("an empty accumulator accepts the blank leaf");
        MaciState {
            state_aq,
            state_leaves: vec![blank],
            polls: Vec::new(),
        }
    }

    /// Number of real sign-ups (the blank leaf is not counted).
    pub fn num_sign_ups(&self) -> u64 {
        self.state_leaves.len() as u64 - 1
    }

    pub fn state_leaves(&self) -> &[StateLeaf] {
        &self.state_leaves
    }

    /// Append a participant; returns the assigned state index. Index 0 is
    /// reserved for the blank leaf, so the first sign-up gets index 1.
    pub fn sign_up(
        &mut self,
        pub_key: PubKey,
        voice_credit_balance: u64,
        timestamp: u64,
    ) -> Result<u64, CoreError> {
        let leaf = StateLeaf::new(pub_key, voice_credit_balance, timestamp);
        let count = self.state_aq.insert(leaf.hash()).map_err(|e| match e {
            AccumError::Full(_) => CoreError::StateTreeFull,
            other => CoreError::Accum(other),
        })?;
        self.state_leaves.push(leaf);
        Ok(count - 1)
    }

    /// Snapshot the sign-up ledger and construct a new poll against it.
    /// Later sign-ups do not affect the deployed poll.
    #[allow(clippy::too_many_arguments)]
    pub fn deploy_poll(
        &mut self,
        duration: u64,
        max_values: MaxValues,
        tree_depths: TreeDepths,
        message_batch_size: usize,
        coordinator: Keypair,
        process_vk: VerifyingKey,
        tally_vk: VerifyingKey,
    ) -> Result<u64, CoreError> {
        if max_values.max_users > capacity(STATE_TREE_DEPTH) {
            return Err(CoreError::BadPollConfig(
                "user limit exceeds the state tree capacity",
            ));
        }
        let poll_id = self.polls.len() as u64;
        let poll = Poll::new(
            poll_id,
            duration,
            max_values,
            tree_depths,
            message_batch_size,
            coordinator,
            process_vk,
            tally_vk,
            self.state_leaves.clone(),
        )?;
        self.polls.push(poll);
        Ok(poll_id)
    }

    pub fn poll(&self, poll_id: u64) -> Result<&Poll, CoreError> {
        self.polls
            .get(poll_id as usize)
            .ok_or(CoreError::PollNotFound(poll_id))
    }

    pub fn poll_mut(&mut self, poll_id: u64) -> Result<&mut Poll, CoreError> {
        self.polls
            .get_mut(poll_id as usize)
            .ok_or(CoreError::PollNotFound(poll_id))
    }

    pub fn num_polls(&self) -> u64 {
        self.polls.len() as u64
    }

    /// Root of the sign-up accumulator at the full state tree depth; fails
    /// unless the accumulator has been merged since the last sign-up.
    pub fn state_root(&self) -> Result<Fr, CoreError> {
        Ok(self.state_aq.root(STATE_TREE_DEPTH)?)
    }
}

impl Default for MaciState {
    fn default() -> Self {
        Self::new()
    }
}
