use ff::Field;
use itertools::izip;
use mpc::{
    protocol::{CircuitBuilder, PublicWire, SecretWire},
    suite::ProtocolSuite,
    MpcField, MpcShare,
};

use crate::{bitwise_less_than, random_mask, RandomMask};

/// Opening of x + r for an input of `bit_length` bits and a mask r wide enough to hide it.
struct MaskedOpening {
    mask: RandomMask,
    opened: PublicWire,
}

fn open_masked<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    x: SecretWire,
    bit_length: usize,
) -> MaskedOpening {
    let mask_bits = bit_length + b.security_parameter();
    assert!(
        mask_bits < S::Field::SAFE_BITS,
        "Input of {bit_length} bits is too long to be masked"
    );
    b.seq(|b| {
        let mask = random_mask(b, mask_bits);
        let masked = b.add(x, mask.value);
        let opened = b.open(masked);
        MaskedOpening { mask, opened }
    })
}

/// Split opened masked value c = x + r at bit k into x mod 2^k and x >> k.
fn split_at<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    masked: &MaskedOpening,
    k: usize,
    borrow: SecretWire,
    low: PublicWire,
    high: PublicWire,
) -> (SecretWire, SecretWire) {
    // x mod 2^k = c_low - r_low + 2^k·[c_low < r_low]
    let low_bits: Vec<_> = [borrow]
        .into_iter()
        .chain(masked.mask.bits[..k].iter().copied())
        .collect();
    // x >> k = c_high - r_high - [c_low < r_low]
    let high_bits: Vec<_> = [borrow]
        .into_iter()
        .chain(masked.mask.bits[k..].iter().copied())
        .collect();

    b.par(|b| {
        let remainder = b.local(&low_bits, &[low], move |suite, bits, c_low| {
            let r_low = weighted_sum::<S>(&bits[1..]);
            suite.add_public(bits[0] * S::Field::power_of_two(k) - r_low, c_low[0])
        });
        let quotient = b.local(&high_bits, &[high], move |suite, bits, c_high| {
            let r_high = weighted_sum::<S>(&bits[1..]);
            suite.add_public(-bits[0] - r_high, c_high[0])
        });
        (quotient, remainder)
    })
}

/// Σ 2^i·bits[i].
fn weighted_sum<S: ProtocolSuite>(bits: &[S::Share]) -> S::Share {
    bits.iter()
        .rev()
        .fold(S::Share::zero(), |acc, &bit| acc.double() + bit)
}

fn split_public<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    opened: PublicWire,
    k: usize,
) -> (PublicWire, PublicWire) {
    b.par(|b| {
        let low = b.map_public(&[opened], move |c| c[0].low_bits(k));
        let high = b.map_public(&[opened], move |c| c[0].shr(k));
        (low, high)
    })
}

/// Floor division of a `bit_length`-bit unsigned integer by 2^k.
/// Returns pair of sharings (x >> k, x mod 2^k).
/// Cost: bit_length + κ random bits, 1 opening, ⌈log k⌉ + 1 communication rounds.
/// Warning: guarantees only statistical privacy with κ = security parameter, input cannot overflow.
pub fn right_shift<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    x: SecretWire,
    bit_length: usize,
    k: usize,
) -> (SecretWire, SecretWire) {
    // Mod2M algorithm from "Improved Primitives for Secure Multiparty Integer Computation"
    // (https://citeseerx.ist.psu.edu/viewdoc/download?doi=10.1.1.220.9499&rep=rep1&type=pdf)
    assert!(k <= bit_length, "Shift by {k} exceeds bit length {bit_length}");
    if k == 0 {
        return (x, b.known(S::Field::zero()));
    }

    b.seq(|b| {
        let masked = open_masked(b, x, bit_length);
        let (low, high) = split_public(b, masked.opened, k);
        let borrow = bitwise_less_than(b, low, &masked.mask.bits[..k]);
        split_at(b, &masked, k, borrow, low, high)
    })
}

/// All shifts x >> 1, ..., x >> n together with bits 0..n-1 of x, for an unsigned
/// `bit_length`-bit integer x. Shares a single mask and opening between all shifts.
/// Cost: bit_length + κ random bits, 1 opening, ⌈log n⌉ + 1 communication rounds.
pub fn repeated_right_shift<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    x: SecretWire,
    bit_length: usize,
    n: usize,
) -> (Vec<SecretWire>, Vec<SecretWire>) {
    assert!(n <= bit_length, "Shift by {n} exceeds bit length {bit_length}");
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    b.seq(|b| {
        let masked = open_masked(b, x, bit_length);
        let splits = b.par(|b| {
            (1..=n)
                .map(|k| split_public(b, masked.opened, k))
                .collect::<Vec<_>>()
        });
        let borrows = b.par(|b| {
            splits
                .iter()
                .enumerate()
                .map(|(i, &(low, _))| bitwise_less_than(b, low, &masked.mask.bits[..=i]))
                .collect::<Vec<_>>()
        });
        let (shifted, remainders): (Vec<_>, Vec<_>) = b.par(|b| {
            izip!(1..=n, &borrows, &splits)
                .map(|(k, &borrow, &(low, high))| split_at(b, &masked, k, borrow, low, high))
                .unzip()
        });

        // bit i = ((x mod 2^(i+1)) - (x mod 2^i)) / 2^i
        let bits = b.par(|b| {
            remainders
                .iter()
                .enumerate()
                .map(|(i, &remainder)| {
                    let scale = S::Field::power_of_two_inverse(i);
                    match i {
                        0 => remainder,
                        _ => b.linear(
                            &[(scale, remainder), (-scale, remainders[i - 1])],
                            S::Field::zero(),
                        ),
                    }
                })
                .collect::<Vec<_>>()
        });
        (shifted, bits)
    })
}

/// Test if a signed integer with |a| < 2^L is nonnegative. Returns sharing of [a >= 0].
pub fn is_nonnegative<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    a: SecretWire,
    bit_length: usize,
) -> SecretWire {
    b.seq(|b| {
        let shifted = b.add_public(a, S::Field::power_of_two(bit_length));
        right_shift(b, shifted, bit_length + 1, bit_length).0
    })
}

#[cfg(test)]
mod tests {
    use mpc::testing::*;

    use super::*;

    #[tokio::test]
    async fn test_right_shift() {
        let run = test_circuit(|b| {
            let x = b.known(MockField::from(12332157));
            let (quotient, remainder) = right_shift(b, x, 24, 1);
            b.par(|b| (b.open(quotient), b.open(remainder)))
        })
        .await;

        let (quotient, remainder) = run.wires;
        assert_eq!(run.outputs.get(quotient), Some(MockField::from(6166078)));
        assert_eq!(run.outputs.get(remainder), Some(MockField::from(1)));
        assert_eq!(run.stats.preprocessing.bits, 24 + 80);
    }

    #[tokio::test]
    async fn test_right_shift_various() {
        let cases: [(u64, usize); 6] =
            [(0, 3), (7, 3), (8, 3), (1 << 20, 20), (123456, 10), (5, 0)];
        let run = test_circuit(|b| {
            b.par(|b| {
                cases
                    .iter()
                    .map(|&(value, k)| {
                        b.seq(|b| {
                            let x = b.known(value.into());
                            let (quotient, remainder) = right_shift(b, x, 21, k);
                            b.par(|b| (b.open(quotient), b.open(remainder)))
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await;

        for (&(value, k), &(quotient, remainder)) in cases.iter().zip(&run.wires) {
            assert_eq!(run.outputs.get(quotient), Some(MockField::from(value >> k)));
            assert_eq!(
                run.outputs.get(remainder),
                Some(MockField::from(value % (1 << k)))
            );
        }
    }

    #[tokio::test]
    async fn test_repeated_right_shift() {
        let value: u64 = 12332153;
        let run = test_circuit(|b| {
            let x = b.known(value.into());
            let (shifted, bits) = repeated_right_shift(b, x, 24, 7);
            b.par(|b| {
                let shifted: Vec<_> = shifted.iter().map(|&s| b.open(s)).collect();
                let bits: Vec<_> = bits.iter().map(|&s| b.open(s)).collect();
                (shifted, bits)
            })
        })
        .await;

        let (shifted, bits) = &run.wires;
        for (k, result) in (1..=7).zip(run.outputs.get_all(shifted)) {
            assert_eq!(result, Some(MockField::from(value >> k)));
        }
        for (i, result) in run.outputs.get_all(bits).into_iter().enumerate() {
            assert_eq!(result, Some(MockField::from((value >> i) & 1)));
        }
        assert_eq!(run.stats.preprocessing.bits, 24 + 80);
        assert_eq!(run.stats.preprocessing.total_input_masks(), 0);
        assert!(run.stats.network_rounds < 7);
    }

    #[tokio::test]
    async fn test_is_nonnegative() {
        let cases: [i64; 6] = [0, 1, -1, 1000, -1000, -(1 << 15) + 1];
        let run = test_circuit(|b| {
            b.par(|b| {
                cases
                    .iter()
                    .map(|&value| {
                        b.seq(|b| {
                            let magnitude = MockField::from(value.unsigned_abs());
                            let x = b.known(if value < 0 { -magnitude } else { magnitude });
                            let result = is_nonnegative(b, x, 16);
                            b.open(result)
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await;

        for (&value, result) in cases.iter().zip(run.outputs.get_all(&run.wires)) {
            let expected = if value >= 0 { 1 } else { 0 };
            assert_eq!(result, Some(MockField::from(expected)), "{value}");
        }
    }
}
