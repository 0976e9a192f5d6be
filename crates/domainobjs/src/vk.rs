//! Opaque verifying-key records.
//!
//! The state machine stores and forwards these per poll; it never inspects
//! them. Coordinates are carried as protocol field elements.

use maci_crypto::Fr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct G1Point {
    pub x: Fr,
    pub y: Fr,
}

impl G1Point {
    pub fn new(x: Fr, y: Fr) -> Self {
        G1Point { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct G2Point {
    pub x: [Fr; 2],
    pub y: [Fr; 2],
}

impl G2Point {
    pub fn new(x: [Fr; 2], y: [Fr; 2]) -> Self {
        G2Point { x, y }
    }
}

/// Groth16-shaped verifying key: one G1 point, three G2 points, and the
/// ordered IC points. Passed through unmodified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyingKey {
    pub alpha1: G1Point,
    pub beta2: G2Point,
    pub gamma2: G2Point,
    pub delta2: G2Point,
    pub ic: Vec<G1Point>,
}

impl VerifyingKey {
    pub fn new(
        alpha1: G1Point,
        beta2: G2Point,
        gamma2: G2Point,
        delta2: G2Point,
        ic: Vec<G1Point>,
    ) -> Self {
        VerifyingKey {
            alpha1,
            beta2,
            gamma2,
            delta2,
            ic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_stored_verbatim() {
        let vk = VerifyingKey::new(
            G1Point::new(Fr::from(0u64), Fr::from(1u64)),
            G2Point::new([Fr::from(0u64); 2], [Fr::from(1u64); 2]),
            G2Point::new([Fr::from(3u64), Fr::from(0u64)], [Fr::from(1u64); 2]),
            G2Point::new([Fr::from(4u64), Fr::from(0u64)], [Fr::from(1u64); 2]),
            vec![
                G1Point::new(Fr::from(5u64), Fr::from(1u64)),
                G1Point::new(Fr::from(6u64), Fr::from(1u64)),
            ],
        );
        assert_eq!(vk.ic.len(), 2);
        assert_eq!(vk.clone(), vk);
    }
}
