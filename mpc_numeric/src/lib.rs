//! Integer arithmetic on shared values: comparison, truncation and division.
//!
//! All protocols assume that shared values are unsigned integers of known bit length, embedded
//! in a field large enough to hold them together with a statistical masking slack.

mod compare;
mod division;
mod mask;
mod shift;

pub use compare::bitwise_less_than;
pub use division::{
    divide, divide_by_public, divide_prepared, prepare_divisor, DivisionParams, PreparedDivisor,
};
pub use mask::{compose_bits, random_mask, RandomMask};
pub use shift::{is_nonnegative, repeated_right_shift, right_shift};
