use std::{
    fmt::Debug,
    ops::{Add, Mul, Neg, Sub},
};

pub mod circuits;
pub mod config;
pub mod error;
pub mod executor;
pub mod fields;
pub mod plaintext;
pub mod protocol;
pub mod spdz;
pub mod storage;
pub mod suite;
pub mod testing;
pub mod transport;

pub use error::MpcError;
pub use fields::MpcField;

/// Private share of a field element.
/// Sharing is linear and supports multiplication by plaintext field elements without communication.
pub trait MpcShare:
    Copy
    + Clone
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + Mul<Self::Field, Output = Self>
{
    /// Field type of value represented by this share.
    type Field: MpcField;

    /// Sharing of zero.
    fn zero() -> Self;

    /// Multiply share by two.
    fn double(&self) -> Self;
}

/// Sharing-based MPC computation context.
pub trait MpcContext {
    /// Field type used by this MPC protocol.
    type Field: MpcField;

    /// Share type used by this MPC protocol.
    type Share: MpcShare<Field = Self::Field>;

    /// Number of parties participating in MPC computation.
    fn num_parties(&self) -> usize;

    /// ID of current party.
    fn party_id(&self) -> usize;
}

/// Dealer of precomputed parameters for MPC computation.
/// Every item is handed out at most once.
pub trait MpcDealer: MpcContext {
    /// Random sharing of a secret random triple (a, b, c) that satisfies ab = c.
    fn next_beaver_triple(&mut self) -> Result<(Self::Share, Self::Share, Self::Share), MpcError>;

    /// Random sharing of a secret random bit.
    fn next_bit(&mut self) -> Result<Self::Share, MpcError>;

    /// Amount of preprocessed material handed out so far.
    fn consumed(&self) -> PreprocessingStats;
}

/// Counters of consumed preprocessed material.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreprocessingStats {
    pub triples: usize,
    pub bits: usize,
    pub exp_pipes: usize,
    /// Input masks consumed, indexed by the party that knows the mask.
    pub input_masks: Vec<usize>,
}

impl PreprocessingStats {
    /// Empty counters for given number of parties.
    pub fn new(num_parties: usize) -> Self {
        Self {
            input_masks: vec![0; num_parties],
            ..Default::default()
        }
    }

    /// Total number of input masks consumed.
    pub fn total_input_masks(&self) -> usize {
        self.input_masks.iter().sum()
    }
}
