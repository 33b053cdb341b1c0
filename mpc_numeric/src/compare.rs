use ff::Field;
use mpc::{
    circuits::fold_tree,
    protocol::{CircuitBuilder, PublicWire, SecretWire},
    suite::ProtocolSuite,
    MpcField,
};

/// Compare public unsigned integer with a hidden integer, provided sharings of its individual bits.
/// Returns sharing of [lhs < rhs]. Bits of `lhs` above `rhs_bits.len()` must be zero.
/// Cost: 2(n-1) Beaver triples, ⌈log n⌉ communication rounds for n bits.
pub fn bitwise_less_than<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    lhs: PublicWire,
    rhs_bits: &[SecretWire],
) -> SecretWire {
    // Given bit sequences L and R, let us define f(L, R) to be a pair (cmp, neq) such that
    // a) if L < R, then cmp = -1, neq = 1;
    // b) if L > R, then cmp = 1, neq = 1;
    // c) if L = R, then cmp = 0, neq = 0.
    // f(AB, CD) can be computed from f(A, C) and f(B, D) using 2 multiplications,
    // so the whole sequence is folded in log_2(bits) rounds.
    b.seq(|b| {
        // 1. Map individual bits into pairs (cmp, neq).
        let base_cases = b.par(|b| {
            rhs_bits
                .iter()
                .enumerate()
                .map(|(i, &bit)| {
                    let cmp = b.local(&[bit], &[lhs], move |suite, rhs, lhs| {
                        if lhs[0].bit(i) {
                            suite.share_plain(S::Field::one()) - rhs[0]
                        } else {
                            -rhs[0]
                        }
                    });
                    let neq = b.local(&[bit], &[lhs], move |suite, rhs, lhs| {
                        if lhs[0].bit(i) {
                            suite.share_plain(S::Field::one()) - rhs[0]
                        } else {
                            rhs[0]
                        }
                    });
                    (cmp, neq)
                })
                .collect::<Vec<_>>()
        });

        // 2. Fold the sequence of pairs, lower bits first.
        let folded = fold_tree(b, base_cases, |b, low, high| {
            let (a, c) = b.par(|b| (b.mul(low.0, high.1), b.mul(low.1, high.1)));
            let one = S::Field::one();
            b.par(|b| {
                let cmp = b.linear(&[(one, low.0), (one, high.0), (-one, a)], S::Field::zero());
                let neq = b.linear(&[(one, low.1), (one, high.1), (-one, c)], S::Field::zero());
                (cmp, neq)
            })
        });

        // 3. Convert aggregated pair into sharing of [lhs < rhs].
        match folded {
            Some((cmp, neq)) => {
                let half = S::Field::power_of_two_inverse(1);
                b.linear(&[(half, neq), (-half, cmp)], S::Field::zero())
            }
            None => b.known(S::Field::zero()),
        }
    })
}

#[cfg(test)]
mod tests {
    use mpc::testing::*;

    use super::*;

    #[tokio::test]
    async fn test_bitwise_less_than() {
        let cases: [(u64, u64); 7] =
            [(100, 100), (100, 101), (101, 100), (100, 200), (200, 100), (0, 1), (0, 0)];
        let run = test_circuit(|b| {
            b.par(|b| {
                cases
                    .iter()
                    .map(|&(lhs, rhs)| {
                        b.seq(|b| {
                            let bits: Vec<_> =
                                (0..8).map(|i| b.known(((rhs >> i) & 1).into())).collect();
                            let lhs = b.seq(|b| {
                                let value = b.known(MockField::from(lhs));
                                b.open(value)
                            });
                            let result = bitwise_less_than(b, lhs, &bits);
                            b.open(result)
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await;

        for (&(lhs, rhs), result) in cases.iter().zip(run.outputs.get_all(&run.wires)) {
            let expected = if lhs < rhs { 1 } else { 0 };
            assert_eq!(result, Some(MockField::from(expected)), "{lhs} < {rhs}");
        }
        // opening of lhs, 3 tree levels, opening of result
        assert_eq!(run.stats.network_rounds, 5);
        assert_eq!(run.stats.preprocessing.triples, 14 * cases.len());
    }

    #[tokio::test]
    async fn test_empty_bits() {
        let run = test_circuit(|b| {
            let lhs = b.known(MockField::zero());
            let lhs = b.open(lhs);
            let result = bitwise_less_than(b, lhs, &[]);
            b.open(result)
        })
        .await;
        assert_eq!(run.outputs.get(run.wires), Some(MockField::zero()));
    }
}
