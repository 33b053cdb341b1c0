use ff::PrimeField;
use serde::{de::DeserializeOwned, Serialize};

/// Prime field usable by the MPC suites.
/// Implementations must use a little-endian representation.
pub trait MpcField: PrimeField + Serialize + DeserializeOwned + 'static {
    /// Integers in range [0; 2^SAFE_BITS) are embedded into the field without wrap-around.
    const SAFE_BITS: usize = Self::CAPACITY as usize;

    /// Compute 2^k.
    fn power_of_two(k: usize) -> Self {
        Self::from(2).pow_vartime([k as u64])
    }

    /// Compute 2^-k.
    fn power_of_two_inverse(k: usize) -> Self {
        Self::power_of_two(k).invert().unwrap()
    }

    /// Embed 128-bit unsigned integer.
    fn from_u128(value: u128) -> Self {
        let high = Self::from((value >> 64) as u64);
        let low = Self::from(value as u64);
        high * Self::power_of_two(64) + low
    }

    /// Lowest 128 bits of canonical representative.
    fn to_u128(&self) -> u128 {
        let repr = self.to_repr();
        repr.as_ref()
            .iter()
            .take(16)
            .rev()
            .fold(0, |acc, &byte| (acc << 8) | u128::from(byte))
    }

    /// Lowest 64 bits of canonical representative.
    fn truncated(&self) -> u64 {
        self.to_u128() as u64
    }

    /// i-th bit of canonical representative.
    fn bit(&self, i: usize) -> bool {
        let repr = self.to_repr();
        match repr.as_ref().get(i / 8) {
            Some(byte) => (byte >> (i % 8)) & 1 == 1,
            None => false,
        }
    }

    /// Canonical representative divided by 2^k and rounded down.
    fn shr(&self, k: usize) -> Self {
        (k..Self::NUM_BITS as usize)
            .rev()
            .fold(Self::zero(), |acc, i| push_bit(acc, self.bit(i)))
    }

    /// Canonical representative modulo 2^k.
    fn low_bits(&self, k: usize) -> Self {
        (0..k.min(Self::NUM_BITS as usize))
            .rev()
            .fold(Self::zero(), |acc, i| push_bit(acc, self.bit(i)))
    }

    /// Field modulus as little-endian bytes.
    fn modulus_bytes() -> Vec<u8> {
        let mut bytes = (-Self::one()).to_repr().as_ref().to_vec();
        for byte in bytes.iter_mut() {
            let (sum, overflow) = byte.overflowing_add(1);
            *byte = sum;
            if !overflow {
                return bytes;
            }
        }
        bytes.push(1);
        bytes
    }
}

fn push_bit<T: PrimeField>(acc: T, bit: bool) -> T {
    if bit {
        acc.double() + T::one()
    } else {
        acc.double()
    }
}

macro_rules! impl_field_serde {
    ($field:ident, $repr:ident) => {
        impl serde::Serialize for $field {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serde::Serialize::serialize(&self.to_repr().0, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $field {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let repr = $repr(serde::Deserialize::deserialize(deserializer)?);
                Self::from_repr_vartime(repr)
                    .ok_or_else(|| serde::de::Error::custom("Invalid field element"))
            }
        }

        impl $crate::fields::MpcField for $field {}
    };
}

mod mersenne_127 {
    use ff::PrimeField;

    /// Finite field mod 2^127-1.
    #[derive(PrimeField)]
    #[PrimeFieldModulus = "170141183460469231731687303715884105727"]
    #[PrimeFieldGenerator = "43"]
    #[PrimeFieldReprEndianness = "little"]
    pub struct Mersenne127([u64; 2]);

    impl_field_serde!(Mersenne127, Mersenne127Repr);
}

mod fp_255 {
    use ff::PrimeField;

    /// 255-bit prime field (scalar field of BLS12-381).
    #[derive(PrimeField)]
    #[PrimeFieldModulus = "52435875175126190479447740508185965837690552500527637822603658699938581184513"]
    #[PrimeFieldGenerator = "7"]
    #[PrimeFieldReprEndianness = "little"]
    pub struct Fp255([u64; 4]);

    impl_field_serde!(Fp255, Fp255Repr);
}

pub use fp_255::{Fp255, Fp255Repr};
pub use mersenne_127::{Mersenne127, Mersenne127Repr};
