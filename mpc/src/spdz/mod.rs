mod fake_dealer;
pub use fake_dealer::FakeSpdzDealer;

mod generator;
pub use generator::{generate_preprocessing, PreprocessingCounts, PreprocessingGenerator};

mod mac_check;

mod pool;
pub use pool::{SpdzInputState, SpdzMulState, SpdzOutputState, SpdzResourcePool};

mod share;
pub use share::SpdzShare;

mod supplier;
pub use supplier::SpdzDataSupplier;

use serde::{Deserialize, Serialize};

use crate::{MpcDealer, MpcError};

/// Share of a random value whose plaintext is known only to the party the mask was generated for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputMask<T> {
    pub share: SpdzShare<T>,
    pub plain: Option<T>,
}

/// Dealer of precomputed parameters for SPDZ protocol.
pub trait SpdzDealer: MpcDealer {
    /// Little-endian modulus of the field the material was generated for.
    fn modulus(&mut self) -> Result<Vec<u8>, MpcError>;

    /// Raw sharing of the global MAC key.
    fn mac_key_share(&mut self) -> Result<Self::Field, MpcError>;

    /// Sharings of [r^-1, r, r^2, ..., r^L] for a random non-zero r.
    fn next_exp_pipe(&mut self) -> Result<Vec<Self::Share>, MpcError>;

    /// Random sharing of a random value with plaintext known to party `owner`.
    /// Plaintext is present only if `owner` is the current party.
    fn next_input_mask(&mut self, owner: usize) -> Result<InputMask<Self::Field>, MpcError>;
}
