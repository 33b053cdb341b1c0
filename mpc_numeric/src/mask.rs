use ff::Field;
use mpc::{
    protocol::{CircuitBuilder, SecretWire},
    suite::ProtocolSuite,
    MpcField,
};

/// Shared random integer together with sharings of its individual bits.
#[derive(Clone, Debug)]
pub struct RandomMask {
    pub value: SecretWire,
    /// Little-endian bits of `value`.
    pub bits: Vec<SecretWire>,
}

/// Sharing of uniformly random `num_bits`-bit integer composed of preprocessed random bits.
/// Cost: `num_bits` random bits, no communication.
pub fn random_mask<S: ProtocolSuite>(b: &mut CircuitBuilder<S>, num_bits: usize) -> RandomMask {
    assert!(
        num_bits < S::Field::SAFE_BITS,
        "Mask of {num_bits} bits does not fit into field"
    );
    b.seq(|b| {
        let bits = b.par(|b| (0..num_bits).map(|_| b.random_bit()).collect::<Vec<_>>());
        let value = compose_bits(b, &bits);
        RandomMask { value, bits }
    })
}

/// Integer Σ 2^i·bits[i] from sharings of little-endian bits. No communication.
pub fn compose_bits<S: ProtocolSuite>(b: &mut CircuitBuilder<S>, bits: &[SecretWire]) -> SecretWire {
    let terms: Vec<_> = bits
        .iter()
        .enumerate()
        .map(|(i, &bit)| (S::Field::power_of_two(i), bit))
        .collect();
    b.linear(&terms, S::Field::zero())
}

#[cfg(test)]
mod tests {
    use mpc::testing::*;

    use super::*;

    #[tokio::test]
    async fn test_mask_matches_its_bits() {
        let run = test_circuit(|b| {
            let mask = random_mask(b, 20);
            b.par(|b| {
                let value = b.open(mask.value);
                let bits: Vec<_> = mask.bits.iter().map(|&bit| b.open(bit)).collect();
                (value, bits)
            })
        })
        .await;

        let (value, bits) = run.wires;
        let value = run.outputs.get(value).unwrap().to_u128();
        assert!(value < 1 << 20);
        for (i, bit) in run.outputs.get_all(&bits).into_iter().enumerate() {
            assert_eq!(bit.unwrap(), MockField::from(((value >> i) & 1) as u64));
        }
        assert_eq!(run.stats.preprocessing.bits, 20);
    }
}
