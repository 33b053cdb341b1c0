//! Generic composites built from atomic gates.

use ff::Field;
use itertools::Itertools;

use crate::{
    protocol::{CircuitBuilder, SecretWire},
    suite::ProtocolSuite,
};

/// Sum of shared values. No communication.
pub fn sum<S: ProtocolSuite>(b: &mut CircuitBuilder<S>, values: &[SecretWire]) -> SecretWire {
    let terms: Vec<_> = values.iter().map(|&x| (S::Field::one(), x)).collect();
    b.linear(&terms, S::Field::zero())
}

/// Inner product of two vectors of shared values.
/// Cost: 1 Beaver triple per element, 1 communication round.
pub fn inner_product<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    lhs: &[SecretWire],
    rhs: &[SecretWire],
) -> SecretWire {
    assert_eq!(lhs.len(), rhs.len(), "Vectors of different lengths");
    b.seq(|b| {
        let products = b.par(|b| {
            lhs.iter()
                .zip(rhs)
                .map(|(&x, &y)| b.mul(x, y))
                .collect::<Vec<_>>()
        });
        sum(b, &products)
    })
}

/// Product of shared values. Sharing of one for empty input.
/// Cost: n-1 Beaver triples, ⌈log n⌉ communication rounds.
pub fn product<S: ProtocolSuite>(b: &mut CircuitBuilder<S>, values: &[SecretWire]) -> SecretWire {
    b.seq(|b| match fold_tree(b, values.to_vec(), |b, x, y| b.mul(x, y)) {
        Some(result) => result,
        None => b.known(S::Field::one()),
    })
}

/// Reduce values with associative `combine` along a balanced binary tree.
/// Pairs on the same tree level are combined in parallel, each pair in its own sequential scope.
/// Returns None for empty input.
pub fn fold_tree<S, T, F>(b: &mut CircuitBuilder<S>, values: Vec<T>, mut combine: F) -> Option<T>
where
    S: ProtocolSuite,
    F: FnMut(&mut CircuitBuilder<S>, T, T) -> T,
{
    let mut level = values;
    b.seq(|b| {
        while level.len() > 1 {
            level = b.par(|b| {
                let pairs = level.into_iter().chunks(2);
                let mut next = Vec::new();
                for mut pair in &pairs {
                    let first = pair.next().expect("Chunks are never empty");
                    next.push(match pair.next() {
                        Some(second) => b.seq(|b| combine(b, first, second)),
                        None => first,
                    });
                }
                next
            });
        }
        level.pop()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn known_range(b: &mut CircuitBuilder<MockSuite>, n: u64) -> Vec<SecretWire> {
        b.par(|b| (1..=n).map(|i| b.known(i.into())).collect())
    }

    #[tokio::test]
    async fn test_sum() {
        let run = test_circuit(|b| {
            let values = known_range(b, 9);
            let total = sum(b, &values);
            b.open(total)
        })
        .await;
        assert_eq!(run.outputs.get(run.wires), Some(MockField::from(45)));
        assert_eq!(run.stats.preprocessing.triples, 0);
    }

    #[tokio::test]
    async fn test_product_has_logarithmic_depth() {
        let run = test_circuit(|b| {
            let values = known_range(b, 9);
            let total = product(b, &values);
            b.open(total)
        })
        .await;
        assert_eq!(run.outputs.get(run.wires), Some(MockField::from(362880)));
        assert_eq!(run.stats.preprocessing.triples, 8);
        // 4 tree levels, then opening
        assert_eq!(run.stats.network_rounds, 5);
    }

    #[tokio::test]
    async fn test_empty_product() {
        let run = test_circuit(|b| {
            let total = product(b, &[]);
            b.open(total)
        })
        .await;
        assert_eq!(run.outputs.get(run.wires), Some(MockField::from(1)));
    }

    #[tokio::test]
    async fn test_inner_product() {
        let run = test_circuit(|b| {
            let lhs = known_range(b, 4);
            let rhs = known_range(b, 4);
            let result = b.par(|b| inner_product(b, &lhs, &rhs));
            b.open(result)
        })
        .await;
        assert_eq!(run.outputs.get(run.wires), Some(MockField::from(30)));
        assert_eq!(run.stats.network_rounds, 2);
    }

    #[tokio::test]
    async fn test_fold_tree_with_multi_gate_combine() {
        // (x + y)·y, folded left to right within each pair
        let run = test_circuit(|b| {
            let values = known_range(b, 4);
            let result = fold_tree(b, values, |b, x, y| {
                let s = b.add(x, y);
                b.mul(s, y)
            });
            let result = result.unwrap();
            b.open(result)
        })
        .await;
        // level 1: (1+2)·2 = 6, (3+4)·4 = 28; level 2: (6+28)·28 = 952
        assert_eq!(run.outputs.get(run.wires), Some(MockField::from(952)));
    }
}
