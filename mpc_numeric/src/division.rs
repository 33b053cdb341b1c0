use ff::Field;
use mpc::{
    protocol::{CircuitBuilder, SecretWire},
    suite::ProtocolSuite,
    MpcField,
};

use crate::{is_nonnegative, repeated_right_shift, right_shift};

/// Number of bits needed to represent `value`.
fn bit_length(value: u128) -> usize {
    (u128::BITS - value.leading_zeros()) as usize
}

/// Floor division of an unsigned `dividend_bits`-bit integer by a public constant.
/// Returns pair of sharings (x / d, x mod d).
///
/// Exact when ℓ + bit_length(⌊2^ℓ / d⌋) + κ < SAFE_BITS and ℓ < 128, where ℓ = `dividend_bits`
/// and κ is the security parameter. Panics otherwise.
pub fn divide_by_public<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    x: SecretWire,
    d: u128,
    dividend_bits: usize,
) -> (SecretWire, SecretWire) {
    assert!(d > 0, "Division by zero");
    assert!(dividend_bits < 128, "Dividend of {dividend_bits} bits is too long");

    // q' = (x·m) >> ℓ for m = ⌊2^ℓ / d⌋ is either ⌊x / d⌋ or ⌊x / d⌋ - 1.
    let m = (1u128 << dividend_bits) / d;
    let required_bits = dividend_bits + bit_length(m) + b.security_parameter();
    assert!(
        required_bits < S::Field::SAFE_BITS,
        "Division of {dividend_bits}-bit dividend by {d} needs {required_bits} bits, field has {}",
        S::Field::SAFE_BITS
    );
    let d_field = S::Field::from_u128(d);
    b.seq(|b| {
        let scaled = b.scale(x, S::Field::from_u128(m));
        let (estimate, _) = right_shift(b, scaled, dividend_bits + bit_length(m), dividend_bits);
        let remainder = b.linear(&[(S::Field::one(), x), (-d_field, estimate)], S::Field::zero());

        let excess = b.add_public(remainder, -d_field);
        let correction = is_nonnegative(b, excess, bit_length(d) + 1);
        b.par(|b| {
            let quotient = b.add(estimate, correction);
            let remainder = b.linear(
                &[(S::Field::one(), remainder), (-d_field, correction)],
                S::Field::zero(),
            );
            (quotient, remainder)
        })
    })
}

/// Parameters of division by a secret divisor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DivisionParams {
    /// Dividends are unsigned integers of at most this many bits.
    pub dividend_bits: usize,
    /// Divisors are positive integers of at most this many bits.
    pub divisor_bits: usize,
    /// Fractional bits of the fixed-point reciprocal.
    pub precision_bits: usize,
    /// Newton-Raphson iterations.
    pub iterations: usize,
}

impl DivisionParams {
    pub fn new(dividend_bits: usize, divisor_bits: usize) -> Self {
        Self {
            dividend_bits,
            divisor_bits,
            precision_bits: dividend_bits + 8,
            iterations: 5,
        }
    }
}

impl Default for DivisionParams {
    fn default() -> Self {
        Self::new(32, 16)
    }
}

/// Secret divisor with precomputed fixed-point reciprocal, reusable for many dividends.
#[derive(Copy, Clone, Debug)]
pub struct PreparedDivisor {
    divisor: SecretWire,
    /// c·w where c = 2^(ℓd-1-msb(d)) and w ≈ 2^F·2^ℓd / (c·d).
    scaled_reciprocal: SecretWire,
    params: DivisionParams,
}

impl PreparedDivisor {
    pub fn divisor(&self) -> SecretWire {
        self.divisor
    }

    pub fn params(&self) -> DivisionParams {
        self.params
    }
}

/// Compute reciprocal of a secret positive divisor.
///
/// The divisor is normalized into y = d·c / 2^ℓd ∈ [1/2, 1) and 1/y is approximated
/// with Newton-Raphson iterations w' = w·(2 - y·w), starting from 2.9142 - 2y.
pub fn prepare_divisor<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    divisor: SecretWire,
    params: DivisionParams,
) -> PreparedDivisor {
    let DivisionParams {
        divisor_bits,
        precision_bits,
        iterations,
        ..
    } = params;
    assert!(divisor_bits > 0, "Divisor must have at least one bit");
    assert!(
        precision_bits >= divisor_bits && precision_bits <= 100,
        "Unsupported precision of {precision_bits} bits"
    );

    b.seq(|b| {
        // 1. Bits of the divisor.
        let (_, bits) = repeated_right_shift(b, divisor, divisor_bits, divisor_bits);

        // 2. prefix[i] = OR of bits i.. of the divisor, i.e. [msb(d) >= i].
        let mut prefix = vec![bits[divisor_bits - 1]];
        for &bit in bits[..divisor_bits - 1].iter().rev() {
            let high = *prefix.last().expect("Prefix is never empty");
            let both = b.mul(high, bit);
            let one = S::Field::one();
            prefix.push(b.linear(&[(one, high), (one, bit), (-one, both)], S::Field::zero()));
        }
        prefix.reverse();

        // 3. c = 2^(ℓd-1-msb(d)); y = d·c scaled to precision F.
        let scale = {
            let terms: Vec<_> = (0..divisor_bits)
                .flat_map(|i| {
                    let weight = S::Field::power_of_two(divisor_bits - 1 - i);
                    match prefix.get(i + 1) {
                        Some(&next) => vec![(weight, prefix[i]), (-weight, next)],
                        None => vec![(weight, prefix[i])],
                    }
                })
                .collect();
            b.linear(&terms, S::Field::zero())
        };
        let normalized = b.mul(divisor, scale);
        let y = b.scale(normalized, S::Field::power_of_two(precision_bits - divisor_bits));

        // 4. Initial approximation w = 2.9142 - 2y.
        let initial = S::Field::from_u128((29142u128 << precision_bits) / 10000);
        let mut w = b.linear(&[(-S::Field::from(2), y)], initial);

        // 5. Newton-Raphson iterations.
        for _ in 0..iterations {
            let product = b.mul(y, w);
            let (product, _) = right_shift(b, product, 2 * precision_bits + 1, precision_bits);
            let error = b.linear(
                &[(-S::Field::one(), product)],
                S::Field::power_of_two(precision_bits + 1),
            );
            let next = b.mul(w, error);
            w = right_shift(b, next, 2 * precision_bits + 2, precision_bits).0;
        }

        let scaled_reciprocal = b.mul(scale, w);
        PreparedDivisor {
            divisor,
            scaled_reciprocal,
            params,
        }
    })
}

/// Floor division of an unsigned integer by a prepared secret divisor.
/// Returns pair of sharings (x / d, x mod d).
pub fn divide_prepared<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    x: SecretWire,
    divisor: &PreparedDivisor,
) -> (SecretWire, SecretWire) {
    let DivisionParams {
        dividend_bits,
        divisor_bits,
        precision_bits,
        ..
    } = divisor.params;
    let d = divisor.divisor;
    let one = S::Field::one();

    b.seq(|b| {
        // q' = (x·c·w) >> (F + ℓd) is off by at most one.
        let product = b.mul(x, divisor.scaled_reciprocal);
        let (estimate, _) = right_shift(
            b,
            product,
            dividend_bits + divisor_bits + precision_bits,
            precision_bits + divisor_bits,
        );
        let estimate_times_d = b.mul(estimate, d);
        let remainder = b.sub(x, estimate_times_d);

        let excess = b.sub(remainder, d);
        let (positive, big) = b.par(|b| {
            (
                is_nonnegative(b, remainder, divisor_bits + 2),
                is_nonnegative(b, excess, divisor_bits + 2),
            )
        });
        let quotient = b.linear(&[(one, estimate), (one, positive), (one, big)], -one);
        let quotient_times_d = b.mul(quotient, d);
        let remainder = b.sub(x, quotient_times_d);
        (quotient, remainder)
    })
}

/// Floor division of unsigned integers x / d, where d is a secret positive integer.
/// Returns pair of sharings (x / d, x mod d).
pub fn divide<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    x: SecretWire,
    d: SecretWire,
    params: DivisionParams,
) -> (SecretWire, SecretWire) {
    b.seq(|b| {
        let prepared = prepare_divisor(b, d, params);
        divide_prepared(b, x, &prepared)
    })
}
