//! Witness-generation boundary.
//!
//! The state machine hands each generated-inputs bundle to a collaborator
//! that compiles a circuit witness. The core only relies on the contract
//! "same inputs, same witness; malformed inputs, failure". Proving itself
//! lives outside this repo.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use blake2b_simd::Params as Blake2bParams;
use ff::PrimeField;
use maci_crypto::Fr;

const WITNESS_PERSONAL: &[u8; 16] = b"maci.witness.v1\0";

/// A named-signal view of one circuit invocation: every signal is a list of
/// field elements, keyed by name in deterministic (sorted) order.
#[derive(Clone, Debug, Default)]
pub struct CircuitInputs {
    pub circuit: String,
    pub signals: BTreeMap<String, Vec<Fr>>,
}

impl CircuitInputs {
    pub fn new(circuit: &str) -> Self {
        CircuitInputs {
            circuit: circuit.to_owned(),
            signals: BTreeMap::new(),
        }
    }

    /// Append one element to a signal, creating the signal if needed.
    pub fn push(&mut self, signal: &str, value: Fr) {
        self.signals.entry(signal.to_owned()).or_default().push(value);
    }

    /// Append many elements to a signal.
    pub fn extend(&mut self, signal: &str, values: impl IntoIterator<Item = Fr>) {
        self.signals
            .entry(signal.to_owned())
            .or_default()
            .extend(values);
    }

    /// Hex-quoted JSON rendering of the signal map, for external provers.
    pub fn to_json(&self) -> serde_json::Value {
        let signals: serde_json::Map<String, serde_json::Value> = self
            .signals
            .iter()
            .map(|(name, values)| {
                let list: Vec<serde_json::Value> = values
                    .iter()
                    .map(|v| {
                        serde_json::Value::String(format!("0x{}", hex::encode(v.to_repr())))
                    })
                    .collect();
                (name.clone(), serde_json::Value::Array(list))
            })
            .collect();
        serde_json::json!({
            "circuit": self.circuit,
            "signals": signals,
        })
    }
}

/// An opaque witness blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness(pub Vec<u8>);

/// Compiles a circuit witness from a generated-inputs bundle.
pub trait WitnessGenerator {
    fn gen_witness(&self, inputs: &CircuitInputs) -> Result<Witness>;
}

/// Deterministic transcript-hash witness builder: structural validation plus
/// a BLAKE2b digest over the named signals. Stands in for an external
/// snarkjs/circom-style generator in tests and dry runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashWitnessGenerator;

impl WitnessGenerator for HashWitnessGenerator {
    fn gen_witness(&self, inputs: &CircuitInputs) -> Result<Witness> {
        if inputs.circuit.is_empty() {
            bail!("circuit name is empty");
        }
        if inputs.signals.is_empty() {
            bail!("no signals for circuit {}", inputs.circuit);
        }
        let mut transcript = Vec::new();
        transcript.extend_from_slice(inputs.circuit.as_bytes());
        transcript.push(0);
        for (name, values) in &inputs.signals {
            if name.is_empty() {
                bail!("unnamed signal in circuit {}", inputs.circuit);
            }
            if values.is_empty() {
                bail!("signal {} has no elements", name);
            }
            transcript.extend_from_slice(name.as_bytes());
            transcript.push(0);
            transcript.extend_from_slice(&(values.len() as u64).to_le_bytes());
            for v in values {
                transcript.extend_from_slice(v.to_repr().as_ref());
            }
        }
        let hash = Blake2bParams::new()
            .hash_length(64)
            .personal(WITNESS_PERSONAL)
            .hash(&transcript);
        Ok(Witness(hash.as_bytes().to_vec()))
    }
}
