use std::{
    marker::PhantomData,
    ops::{Add, Mul, Neg, Sub},
};

use async_trait::async_trait;
use rand::{thread_rng, Rng};

use crate::{
    protocol::RoundMessages,
    suite::{
        begin_beaver_mul, finish_beaver_mul, AddProtocol, BeaverMulState, InputProtocol,
        MulProtocol, OpenProtocol, ProtocolSuite,
    },
    MpcContext, MpcDealer, MpcError, MpcField, MpcShare, PreprocessingStats,
};

/// Mock protocol suite that computes result in plain on a single node.
/// Consumption of preprocessed material and communication rounds are simulated.
pub struct PlainSuite<T: MpcField> {
    _phantom: PhantomData<T>,
    consumed: PreprocessingStats,
    num_openings: usize,
    num_exchanges: usize,
}

impl<T: MpcField> PlainSuite<T> {
    /// Create a new instance of mock.
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
            consumed: PreprocessingStats::new(1),
            num_openings: 0,
            num_exchanges: 0,
        }
    }

    /// Get total count of opened values.
    pub fn num_openings(&self) -> usize {
        self.num_openings
    }

    /// Get total number of simulated network rounds.
    pub fn num_exchanges(&self) -> usize {
        self.num_exchanges
    }
}

impl<T: MpcField> Default for PlainSuite<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MpcField> MpcContext for PlainSuite<T> {
    type Field = T;
    type Share = PlainShare<T>;

    fn num_parties(&self) -> usize {
        1
    }

    fn party_id(&self) -> usize {
        0
    }
}

impl<T: MpcField> MpcDealer for PlainSuite<T> {
    fn next_beaver_triple(&mut self) -> Result<(Self::Share, Self::Share, Self::Share), MpcError> {
        let mut rng = thread_rng();
        let a = T::random(&mut rng);
        let b = T::random(&mut rng);
        self.consumed.triples += 1;
        Ok((PlainShare(a), PlainShare(b), PlainShare(a * b)))
    }

    fn next_bit(&mut self) -> Result<Self::Share, MpcError> {
        self.consumed.bits += 1;
        Ok(PlainShare(T::from(thread_rng().gen_range(0..=1))))
    }

    fn consumed(&self) -> PreprocessingStats {
        self.consumed.clone()
    }
}

impl<T: MpcField> AddProtocol for PlainSuite<T> {
    fn add_public(&self, a: Self::Share, k: Self::Field) -> Self::Share {
        PlainShare(a.0 + k)
    }
}

impl<T: MpcField> MulProtocol for PlainSuite<T> {
    type MulState = BeaverMulState<PlainShare<T>>;

    fn begin_mul(
        &mut self,
        a: Self::Share,
        b: Self::Share,
        round: &mut RoundMessages<T>,
    ) -> Result<Self::MulState, MpcError> {
        let triple = self.next_beaver_triple()?;
        Ok(begin_beaver_mul(self, a, b, triple, round))
    }

    fn finish_mul(
        &mut self,
        state: Self::MulState,
        round: &mut RoundMessages<T>,
    ) -> Result<Self::Share, MpcError> {
        finish_beaver_mul(self, state, round)
    }
}

impl<T: MpcField> OpenProtocol for PlainSuite<T> {
    type OutputState = (usize, PlainShare<T>);

    fn begin_open(&mut self, a: Self::Share, round: &mut RoundMessages<T>) {
        round.broadcast(a.0);
    }

    fn finish_open(&mut self, a: Self::Share, _round: &mut RoundMessages<T>) -> Result<T, MpcError> {
        self.num_openings += 1;
        Ok(a.0)
    }

    fn begin_output(
        &mut self,
        receiver: usize,
        a: Self::Share,
        round: &mut RoundMessages<T>,
    ) -> Result<Self::OutputState, MpcError> {
        self.consumed.input_masks[0] += 1;
        self.begin_open(a, round);
        Ok((receiver, a))
    }

    fn finish_output(
        &mut self,
        (receiver, a): Self::OutputState,
        round: &mut RoundMessages<T>,
    ) -> Result<Option<T>, MpcError> {
        let value = self.finish_open(a, round)?;
        Ok((receiver == 0).then(|| value))
    }
}

impl<T: MpcField> InputProtocol for PlainSuite<T> {
    type InputState = PlainShare<T>;

    fn begin_input(
        &mut self,
        owner: usize,
        value: Option<T>,
        round: &mut RoundMessages<T>,
    ) -> Result<Self::InputState, MpcError> {
        let value = match (owner, value) {
            (0, Some(value)) => value,
            _ => return Err(MpcError::MissingInput(owner)),
        };
        self.consumed.input_masks[0] += 1;
        round.broadcast(T::zero());
        Ok(PlainShare(value))
    }

    fn finish_input(
        &mut self,
        state: Self::InputState,
        _round: &mut RoundMessages<T>,
    ) -> Result<Self::Share, MpcError> {
        Ok(state)
    }
}

#[async_trait(?Send)]
impl<T: MpcField> ProtocolSuite for PlainSuite<T> {
    fn random_bit(&mut self) -> Result<Self::Share, MpcError> {
        self.next_bit()
    }

    async fn exchange(&mut self, round: &mut RoundMessages<T>) -> Result<(), MpcError> {
        round.take_outgoing();
        self.num_exchanges += 1;
        Ok(())
    }

    async fn verify(&mut self) -> Result<(), MpcError> {
        Ok(())
    }

    fn preprocessing_stats(&self) -> PreprocessingStats {
        self.consumed()
    }
}

/// Mock share of a computation run on a single node. Wraps plaintext value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlainShare<T>(pub T);

impl<T: MpcField> MpcShare for PlainShare<T> {
    type Field = T;

    fn zero() -> Self {
        PlainShare(T::zero())
    }

    fn double(&self) -> Self {
        PlainShare(self.0.double())
    }
}

impl<T: MpcField> Add for PlainShare<T> {
    type Output = PlainShare<T>;
    fn add(self, rhs: Self) -> Self::Output {
        PlainShare(self.0 + rhs.0)
    }
}

impl<T: MpcField> Sub for PlainShare<T> {
    type Output = PlainShare<T>;
    fn sub(self, rhs: Self) -> Self::Output {
        PlainShare(self.0 - rhs.0)
    }
}

impl<T: MpcField> Neg for PlainShare<T> {
    type Output = PlainShare<T>;
    fn neg(self) -> Self::Output {
        PlainShare(-self.0)
    }
}

impl<T: MpcField> Mul<T> for PlainShare<T> {
    type Output = PlainShare<T>;
    fn mul(self, rhs: T) -> Self::Output {
        PlainShare(self.0 * rhs)
    }
}
