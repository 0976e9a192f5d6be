//! One poll's configuration, message queue, running trees, and tally.

use ff::{Field, PrimeField};
use serde::{Deserialize, Serialize};

use maci_accum::{capacity, AccQueue, MerklePath, QuinTree, MAX_TREE_DEPTH};
use maci_crypto::{hash2, Fr};
use maci_domainobjs::{Ballot, Command, Keypair, Message, PrivKey, PubKey, Signature, StateLeaf};

use crate::state::STATE_TREE_DEPTH;
use crate::witness::CircuitInputs;
use crate::CoreError;

/// Circuit consuming [`ProcessMessagesInputs`].
pub const MESSAGE_PROCESSING_CIRCUIT: &str = "processMessages";
/// Circuit consuming [`TallyVotesInputs`].
pub const TALLY_CIRCUIT: &str = "tallyVotes";

/// Hard limits of one poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxValues {
    pub max_users: u64,
    pub max_messages: u64,
    pub max_vote_options: u64,
}

/// Tree depths of one poll. `int_state_tree_depth` fixes the tally batch
/// size (`5^depth` ballots per batch); `message_tree_sub_depth` is the
/// subtree depth of the message accumulator queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDepths {
    pub int_state_tree_depth: usize,
    pub message_tree_depth: usize,
    pub message_tree_sub_depth: usize,
    pub vote_option_tree_depth: usize,
}

/// A slot in a processed message batch: either an applied command or a
/// recorded no-op (invalid command or batch padding). Either way the slot
/// keeps its place so the batch has a fixed, circuit-friendly shape.
#[derive(Clone, Debug)]
pub enum MessageSlot {
    Applied {
        command: Command,
        signature: Signature,
    },
    NoOp,
}

/// Circuit-input bundle emitted by one `process_messages` call.
#[derive(Clone, Debug)]
pub struct ProcessMessagesInputs {
    pub poll_id: u64,
    /// Index of the processed batch (batches are consumed highest first).
    pub batch_index: usize,
    pub batch_start: usize,
    pub msg_root: Fr,
    pub old_state_root: Fr,
    pub new_state_root: Fr,
    pub old_ballot_root: Fr,
    pub new_ballot_root: Fr,
    /// Raw messages and ephemeral keys of the batch, in processing order
    /// (reverse of publish order); padding slots are absent.
    pub messages: Vec<Message>,
    pub enc_pub_keys: Vec<PubKey>,
    /// One entry per batch slot, in processing order.
    pub slots: Vec<MessageSlot>,
    /// Pre-update inclusion paths for the state leaf touched by each slot.
    pub state_paths: Vec<MerklePath>,
    /// Pre-update inclusion paths for the ballot touched by each slot.
    pub ballot_paths: Vec<MerklePath>,
    /// Coordinator's ECDH private key, for circuit-side decryption checks.
    pub coordinator_priv_key: PrivKey,
}

/// Circuit-input bundle emitted by one `tally_votes` call.
#[derive(Clone, Debug)]
pub struct TallyVotesInputs {
    pub poll_id: u64,
    /// Index of the tallied batch (batches are consumed in ascending leaf
    /// order).
    pub batch_index: usize,
    pub batch_start: usize,
    pub old_tally_commitment: Fr,
    pub new_tally_commitment: Fr,
    pub new_results_salt: Fr,
    pub new_spent_salt: Fr,
    pub ballot_root: Fr,
    pub ballots: Vec<Ballot>,
    pub ballot_paths: Vec<MerklePath>,
}

/// One deployed poll. Owned by `MaciState` for its whole lifetime; nothing
/// external mutates it directly.
#[derive(Clone, Debug)]
pub struct Poll {
    pub id: u64,
    pub duration: u64,
    pub max_values: MaxValues,
    pub tree_depths: TreeDepths,
    pub message_batch_size: usize,
    pub coordinator: Keypair,
    pub process_vk: maci_domainobjs::VerifyingKey,
    pub tally_vk: maci_domainobjs::VerifyingKey,

    /// Message accumulator; merged (frozen) before processing starts.
    pub message_aq: AccQueue,
    messages: Vec<Message>,
    enc_pub_keys: Vec<PubKey>,

    /// State leaves as of poll deployment; later sign-ups are invisible.
    state_leaves: Vec<StateLeaf>,
    state_tree: Option<QuinTree>,
    ballots: Vec<Ballot>,
    ballot_tree: Option<QuinTree>,

    num_batches_processed: usize,

    results: Vec<u64>,
    total_spent_voice_credits: u128,
    num_tally_batches_done: usize,
    current_tally_commitment: Fr,
}

impl Poll {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u64,
        duration: u64,
        max_values: MaxValues,
        tree_depths: TreeDepths,
        message_batch_size: usize,
        coordinator: Keypair,
        process_vk: maci_domainobjs::VerifyingKey,
        tally_vk: maci_domainobjs::VerifyingKey,
        state_leaves: Vec<StateLeaf>,
    ) -> Result<Self, CoreError> {
        if message_batch_size == 0 {
            return Err(CoreError::BadPollConfig("message batch size is zero"));
        }
        if tree_depths.vote_option_tree_depth == 0
            || tree_depths.vote_option_tree_depth > MAX_TREE_DEPTH
        {
            return Err(CoreError::BadPollConfig(
                "vote option tree depth out of range",
            ));
        }
        if max_values.max_vote_options > capacity(tree_depths.vote_option_tree_depth) {
            return Err(CoreError::BadPollConfig(
                "vote options exceed the vote option tree capacity",
            ));
        }
        if max_values.max_messages > capacity(tree_depths.message_tree_depth) {
            return Err(CoreError::BadPollConfig(
                "message limit exceeds the message tree capacity",
            ));
        }
        if tree_depths.int_state_tree_depth >= STATE_TREE_DEPTH {
            return Err(CoreError::BadPollConfig(
                "tally batch depth must be below the state tree depth",
            ));
        }
        // The snapshot carries the blank leaf at index 0 on top of the real
        // sign-ups, which are what the user limit bounds.
        if (state_leaves.len() as u64).saturating_sub(1) > max_values.max_users {
            return Err(CoreError::TooManyUsers);
        }
        let message_aq = AccQueue::new(
            tree_depths.message_tree_sub_depth,
            tree_depths.message_tree_depth,
        )?;
        let num_options = max_values.max_vote_options as usize;
        Ok(Poll {
            id,
            duration,
            max_values,
            tree_depths,
            message_batch_size,
            coordinator,
            process_vk,
            tally_vk,
            message_aq,
            messages: Vec::new(),
            enc_pub_keys: Vec::new(),
            state_leaves,
            state_tree: None,
            ballots: Vec::new(),
            ballot_tree: None,
            num_batches_processed: 0,
            results: vec![0; num_options],
            total_spent_voice_credits: 0,
            num_tally_batches_done: 0,
            current_tally_commitment: Fr::ZERO,
        })
    }

    /// Number of messages published so far.
    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    /// Append a message to the poll. No command validation happens here:
    /// invalid commands are accepted into the tree on purpose (the
    /// coordinator must not be able to filter messages before they are
    /// committed) and are neutralized during processing instead.
    pub fn publish_message(
        &mut self,
        message: Message,
        enc_pub_key: PubKey,
    ) -> Result<(), CoreError> {
        if self.messages.len() as u64 >= self.max_values.max_messages {
            return Err(CoreError::TooManyMessages);
        }
        self.message_aq.insert(message.hash(&enc_pub_key))?;
        self.messages.push(message);
        self.enc_pub_keys.push(enc_pub_key);
        Ok(())
    }

    fn num_message_batches(&self) -> usize {
        self.messages.len().div_ceil(self.message_batch_size)
    }

    /// Whether every published message batch has been applied.
    pub fn processing_complete(&self) -> bool {
        self.num_batches_processed == self.num_message_batches()
    }

    fn build_trees(&mut self) -> Result<(), CoreError> {
        if self.state_tree.is_some() {
            return Ok(());
        }
        let mut state_tree = QuinTree::new(STATE_TREE_DEPTH)?;
        for leaf in &self.state_leaves {
            state_tree.insert(leaf.hash())?;
        }
        let num_options = self.max_values.max_vote_options as usize;
        let blank = Ballot::new(num_options);
        let blank_hash = blank.hash(self.tree_depths.vote_option_tree_depth)?;
        let mut ballot_tree = QuinTree::new(STATE_TREE_DEPTH)?;
        let mut ballots = Vec::with_capacity(self.state_leaves.len());
        for _ in &self.state_leaves {
            ballot_tree.insert(blank_hash)?;
            ballots.push(blank.clone());
        }
        self.state_tree = Some(state_tree);
        self.ballot_tree = Some(ballot_tree);
        self.ballots = ballots;
        Ok(())
    }

    /// Validate a decrypted command against the current state; `Some` is the
    /// voter's post-application balance.
    fn check_command(&self, cmd: &Command, sig: &Signature) -> Option<u64> {
        let index = cmd.state_index as usize;
        if index == 0 || index >= self.state_leaves.len() {
            return None;
        }
        if cmd.poll_id != self.id {
            return None;
        }
        if cmd.vote_option_index >= self.max_values.max_vote_options {
            return None;
        }
        let ballot = &self.ballots[index];
        if cmd.nonce != ballot.nonce + 1 {
            return None;
        }
        let leaf = &self.state_leaves[index];
        if !cmd.verify_signature(&leaf.pub_key, sig) {
            return None;
        }
        // Quadratic cost: replacing the previous weight on this option
        // refunds its square before the new square is charged.
        let old_w = ballot.votes[cmd.vote_option_index as usize] as u128;
        let new_w = cmd.new_vote_weight as u128;
        let budget = leaf.voice_credit_balance as u128 + old_w * old_w;
        let cost = new_w * new_w;
        if cost > budget {
            return None;
        }
        // The result never exceeds the leaf's original balance.
        Some((budget - cost) as u64)
    }

    /// Apply one batch of messages, consuming from the most recently
    /// published, least-yet-processed end: the last batch is processed
    /// first, and messages within a batch are applied last-published first.
    /// A later message can therefore nullify an earlier conflicting one.
    ///
    /// Invalid or padding slots leave the trees untouched but keep their
    /// position in the emitted bundle. Returns `Ok(None)` once every batch
    /// has been consumed.
    pub fn process_messages(&mut self) -> Result<Option<ProcessMessagesInputs>, CoreError> {
        let num_batches = self.num_message_batches();
        if self.num_batches_processed == num_batches {
            return Ok(None);
        }
        let msg_root = self
            .message_aq
            .root(self.tree_depths.message_tree_depth)
            .map_err(|_| CoreError::MessageTreeNotMerged)?;
        self.build_trees()?;

        let batch_index = num_batches - 1 - self.num_batches_processed;
        let batch_start = batch_index * self.message_batch_size;

        let old_state_root = self.state_tree.as_ref().map(QuinTree::root).unwrap_or(Fr::ZERO);
        let old_ballot_root = self.ballot_tree.as_ref().map(QuinTree::root).unwrap_or(Fr::ZERO);

        let mut messages = Vec::with_capacity(self.message_batch_size);
        let mut enc_pub_keys = Vec::with_capacity(self.message_batch_size);
        let mut slots = Vec::with_capacity(self.message_batch_size);
        let mut state_paths = Vec::with_capacity(self.message_batch_size);
        let mut ballot_paths = Vec::with_capacity(self.message_batch_size);

        for slot in (0..self.message_batch_size).rev() {
            let idx = batch_start + slot;
            if idx >= self.messages.len() {
                // Padding slot: record a no-op transition against leaf 0.
                slots.push(MessageSlot::NoOp);
                state_paths.push(self.state_path(0)?);
                ballot_paths.push(self.ballot_path(0)?);
                continue;
            }
            messages.push(self.messages[idx].clone());
            enc_pub_keys.push(self.enc_pub_keys[idx]);

            let shared = Keypair::gen_ecdh_shared_key(
                &self.coordinator.priv_key,
                &self.enc_pub_keys[idx],
            );
            let decrypted = self.messages[idx].decrypt(&shared).ok();
            let verdict = decrypted
                .as_ref()
                .and_then(|(cmd, sig)| self.check_command(cmd, sig).map(|b| (*cmd, *sig, b)));

            match verdict {
                Some((cmd, sig, new_balance)) => {
                    let index = cmd.state_index;
                    state_paths.push(self.state_path(index)?);
                    ballot_paths.push(self.ballot_path(index)?);

                    let leaf = &mut self.state_leaves[index as usize];
                    leaf.pub_key = cmd.new_pub_key;
                    leaf.voice_credit_balance = new_balance;
                    let leaf_hash = leaf.hash();

                    let ballot = &mut self.ballots[index as usize];
                    ballot.nonce = cmd.nonce;
                    ballot.votes[cmd.vote_option_index as usize] = cmd.new_vote_weight;
                    let ballot_hash = ballot.hash(self.tree_depths.vote_option_tree_depth)?;

                    if let Some(tree) = self.state_tree.as_mut() {
                        tree.update(index, leaf_hash)?;
                    }
                    if let Some(tree) = self.ballot_tree.as_mut() {
                        tree.update(index, ballot_hash)?;
                    }
                    slots.push(MessageSlot::Applied {
                        command: cmd,
                        signature: sig,
                    });
                }
                None => {
                    slots.push(MessageSlot::NoOp);
                    state_paths.push(self.state_path(0)?);
                    ballot_paths.push(self.ballot_path(0)?);
                }
            }
        }

        self.num_batches_processed += 1;
        let new_state_root = self.state_tree.as_ref().map(QuinTree::root).unwrap_or(Fr::ZERO);
        let new_ballot_root = self.ballot_tree.as_ref().map(QuinTree::root).unwrap_or(Fr::ZERO);

        Ok(Some(ProcessMessagesInputs {
            poll_id: self.id,
            batch_index,
            batch_start,
            msg_root,
            old_state_root,
            new_state_root,
            old_ballot_root,
            new_ballot_root,
            messages,
            enc_pub_keys,
            slots,
            state_paths,
            ballot_paths,
            coordinator_priv_key: self.coordinator.priv_key,
        }))
    }

    fn state_path(&self, index: u64) -> Result<MerklePath, CoreError> {
        let tree = self.state_tree.as_ref().expect("trees built before paths");
        Ok(tree.path(index)?)
    }

    fn ballot_path(&self, index: u64) -> Result<MerklePath, CoreError> {
        let tree = self.ballot_tree.as_ref().expect("trees built before paths");
        Ok(tree.path(index)?)
    }

    /// Tally batch size: `5^int_state_tree_depth` ballots per call.
    pub fn tally_batch_size(&self) -> usize {
        capacity(self.tree_depths.int_state_tree_depth) as usize
    }

    fn num_tally_batches(&self) -> usize {
        self.state_leaves.len().div_ceil(self.tally_batch_size())
    }

    /// Whether the `results` vector is authoritative.
    pub fn is_tallied(&self) -> bool {
        self.num_tally_batches_done == self.num_tally_batches()
            && self.processing_complete()
    }

    /// Per-option vote weights. Authoritative only once [`Poll::is_tallied`]
    /// returns true; mid-tally reads see work in progress.
    pub fn results(&self) -> &[u64] {
        &self.results
    }

    /// Total voice credits spent across all tallied ballots.
    pub fn total_spent_voice_credits(&self) -> u128 {
        self.total_spent_voice_credits
    }

    /// Fold one forward batch of ballots into the running results vector and
    /// the salted tally commitment chain. Batches must be applied in
    /// sequence; returns `Ok(None)` once every ballot batch is consumed.
    pub fn tally_votes(&mut self) -> Result<Option<TallyVotesInputs>, CoreError> {
        if !self.processing_complete() {
            return Err(CoreError::ProcessingIncomplete);
        }
        self.build_trees()?;
        let num_batches = self.num_tally_batches();
        if self.num_tally_batches_done == num_batches {
            return Ok(None);
        }
        let batch_index = self.num_tally_batches_done;
        let batch_size = self.tally_batch_size();
        let batch_start = batch_index * batch_size;
        let batch_end = (batch_start + batch_size).min(self.ballots.len());

        let mut ballots = Vec::with_capacity(batch_end - batch_start);
        let mut ballot_paths = Vec::with_capacity(batch_end - batch_start);
        let ballot_root = self.ballot_tree.as_ref().map(QuinTree::root).unwrap_or(Fr::ZERO);

        for i in batch_start..batch_end {
            let ballot = &self.ballots[i];
            for (opt, w) in ballot.votes.iter().enumerate() {
                self.results[opt] += w;
                self.total_spent_voice_credits += (*w as u128) * (*w as u128);
            }
            ballots.push(ballot.clone());
            ballot_paths.push(self.ballot_path(i as u64)?);
        }

        let old_tally_commitment = self.current_tally_commitment;
        let (new_tally_commitment, new_results_salt, new_spent_salt) =
            self.commit_tally(batch_index)?;
        self.current_tally_commitment = new_tally_commitment;
        self.num_tally_batches_done += 1;

        Ok(Some(TallyVotesInputs {
            poll_id: self.id,
            batch_index,
            batch_start,
            old_tally_commitment,
            new_tally_commitment,
            new_results_salt,
            new_spent_salt,
            ballot_root,
            ballots,
            ballot_paths,
        }))
    }

    /// Commitment to the partial results after a batch: salts are chained
    /// from the previous commitment so every intermediate state is
    /// re-derivable, and each batch's output verifiable on its own.
    fn commit_tally(&self, batch_index: usize) -> Result<(Fr, Fr, Fr), CoreError> {
        let new_results_salt = hash2(self.current_tally_commitment, Fr::from(batch_index as u64));
        let new_spent_salt = hash2(new_results_salt, Fr::from(batch_index as u64));

        let mut results_tree =
            QuinTree::with_zero(self.tree_depths.vote_option_tree_depth, Fr::ZERO)?;
        for r in &self.results {
            results_tree.insert(Fr::from(*r))?;
        }
        let results_commitment = hash2(results_tree.root(), new_results_salt);

        let spent = self.total_spent_voice_credits;
        let spent_fr = Fr::from_u128(spent);
        let spent_commitment = hash2(spent_fr, new_spent_salt);

        Ok((
            hash2(results_commitment, spent_commitment),
            new_results_salt,
            new_spent_salt,
        ))
    }
}

impl ProcessMessagesInputs {
    /// Flatten into named circuit signals.
    pub fn to_circuit_inputs(&self) -> CircuitInputs {
        let mut inputs = CircuitInputs::new(MESSAGE_PROCESSING_CIRCUIT);
        inputs.push("pollId", Fr::from(self.poll_id));
        inputs.push("batchStartIndex", Fr::from(self.batch_start as u64));
        inputs.push("msgRoot", self.msg_root);
        inputs.push("currentStateRoot", self.old_state_root);
        inputs.push("newStateRoot", self.new_state_root);
        inputs.push("currentBallotRoot", self.old_ballot_root);
        inputs.push("newBallotRoot", self.new_ballot_root);
        for msg in &self.messages {
            inputs.extend("msgs", msg.data.iter().copied());
        }
        for pk in &self.enc_pub_keys {
            let (x, y) = maci_crypto::point_coordinates(&pk.0);
            inputs.push("encPubKeys", x);
            inputs.push("encPubKeys", y);
        }
        for path in &self.state_paths {
            inputs.push("stateLeafPathIndices", Fr::from(path.index));
            for level in &path.siblings {
                inputs.extend("stateLeafPathElements", level.iter().copied());
            }
        }
        for path in &self.ballot_paths {
            inputs.push("ballotPathIndices", Fr::from(path.index));
            for level in &path.siblings {
                inputs.extend("ballotPathElements", level.iter().copied());
            }
        }
        // The coordinator's ECDH key, so the circuit can re-derive each
        // shared key and check the same decryptions.
        let (lo, hi) = scalar_limbs(&self.coordinator_priv_key);
        inputs.push("coordPrivKey", lo);
        inputs.push("coordPrivKey", hi);
        inputs
    }
}

impl TallyVotesInputs {
    /// Flatten into named circuit signals.
    pub fn to_circuit_inputs(&self) -> CircuitInputs {
        let mut inputs = CircuitInputs::new(TALLY_CIRCUIT);
        inputs.push("pollId", Fr::from(self.poll_id));
        inputs.push("batchStartIndex", Fr::from(self.batch_start as u64));
        inputs.push("ballotRoot", self.ballot_root);
        inputs.push("currentTallyCommitment", self.old_tally_commitment);
        inputs.push("newTallyCommitment", self.new_tally_commitment);
        inputs.push("newResultsRootSalt", self.new_results_salt);
        inputs.push("newSpentVoiceCreditSubtotalSalt", self.new_spent_salt);
        for ballot in &self.ballots {
            inputs.push("ballotNonces", Fr::from(ballot.nonce));
            inputs.extend("votes", ballot.votes.iter().map(|w| Fr::from(*w)));
        }
        for path in &self.ballot_paths {
            inputs.push("ballotPathIndices", Fr::from(path.index));
            for level in &path.siblings {
                inputs.extend("ballotPathElements", level.iter().copied());
            }
        }
        inputs
    }
}

fn scalar_limbs(sk: &PrivKey) -> (Fr, Fr) {
    let repr = sk.0.to_repr();
    let bytes = repr.as_ref();
    let mut lo = [0u8; 16];
    let mut hi = [0u8; 16];
    lo.copy_from_slice(&bytes[..16]);
    hi.copy_from_slice(&bytes[16..]);
    (
        Fr::from_u128(u128::from_le_bytes(lo)),
        Fr::from_u128(u128::from_le_bytes(hi)),
    )
}
