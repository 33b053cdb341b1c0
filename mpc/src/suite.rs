//! Capability interfaces of an arithmetic protocol suite.
//!
//! Communicating primitives are split into a `begin` phase, which queues broadcasts into
//! the shared [`RoundMessages`] buffer, and a `finish` phase, which consumes values received
//! from other parties. The scheduler runs `begin` for a whole batch, performs a single network
//! exchange and then runs `finish` in the same order.

use async_trait::async_trait;

use crate::{
    protocol::RoundMessages, MpcContext, MpcError, MpcShare, PreprocessingStats,
};

/// Local linear operations.
pub trait AddProtocol: MpcContext {
    /// Add two shared values. No communication.
    fn add(&self, a: Self::Share, b: Self::Share) -> Self::Share {
        a + b
    }

    /// Add public constant to shared value. No communication.
    fn add_public(&self, a: Self::Share, k: Self::Field) -> Self::Share;

    /// Sharing of a public value.
    fn share_plain(&self, k: Self::Field) -> Self::Share {
        self.add_public(Self::Share::zero(), k)
    }
}

/// Multiplication of shared values.
/// Cost: 1 Beaver triple, 2 partial openings, 1 communication round.
pub trait MulProtocol: MpcContext {
    /// State kept between the two phases.
    type MulState: 'static;

    fn begin_mul(
        &mut self,
        a: Self::Share,
        b: Self::Share,
        round: &mut RoundMessages<Self::Field>,
    ) -> Result<Self::MulState, MpcError>;

    fn finish_mul(
        &mut self,
        state: Self::MulState,
        round: &mut RoundMessages<Self::Field>,
    ) -> Result<Self::Share, MpcError>;
}

/// Opening of shared values.
pub trait OpenProtocol: MpcContext {
    /// State of output to a single party kept between the two phases.
    type OutputState: 'static;

    fn begin_open(&mut self, a: Self::Share, round: &mut RoundMessages<Self::Field>);

    /// Reconstruct value opened by `begin_open`.
    /// Warning: integrity checks are deferred until [`ProtocolSuite::verify`]. Use with care.
    fn finish_open(
        &mut self,
        a: Self::Share,
        round: &mut RoundMessages<Self::Field>,
    ) -> Result<Self::Field, MpcError>;

    fn begin_output(
        &mut self,
        receiver: usize,
        a: Self::Share,
        round: &mut RoundMessages<Self::Field>,
    ) -> Result<Self::OutputState, MpcError>;

    /// Reconstruct value for `receiver`. Other parties get None.
    fn finish_output(
        &mut self,
        state: Self::OutputState,
        round: &mut RoundMessages<Self::Field>,
    ) -> Result<Option<Self::Field>, MpcError>;
}

/// Secret sharing of private inputs.
pub trait InputProtocol: MpcContext {
    /// State kept between the two phases.
    type InputState: 'static;

    /// If `party_id() != owner`, then `value` is ignored.
    /// If `party_id() == owner`, then `value` must contain input value.
    fn begin_input(
        &mut self,
        owner: usize,
        value: Option<Self::Field>,
        round: &mut RoundMessages<Self::Field>,
    ) -> Result<Self::InputState, MpcError>;

    fn finish_input(
        &mut self,
        state: Self::InputState,
        round: &mut RoundMessages<Self::Field>,
    ) -> Result<Self::Share, MpcError>;
}

/// Complete protocol suite evaluated by [`crate::executor::MpcExecutor`].
#[async_trait(?Send)]
pub trait ProtocolSuite:
    AddProtocol + MulProtocol + OpenProtocol + InputProtocol + 'static
{
    /// Sharing of a preprocessed random bit.
    fn random_bit(&mut self) -> Result<Self::Share, MpcError>;

    /// Send values queued in round buffer and deliver values received from other parties.
    async fn exchange(&mut self, round: &mut RoundMessages<Self::Field>) -> Result<(), MpcError>;

    /// Check integrity of all values opened since last check.
    async fn verify(&mut self) -> Result<(), MpcError>;

    /// Amount of preprocessed material consumed so far.
    fn preprocessing_stats(&self) -> PreprocessingStats;
}

/// State of Beaver-triple multiplication between its two phases.
pub struct BeaverMulState<T> {
    b: T,
    x: T,
    z: T,
    d: T,
    e: T,
}

/// Start multiplication of `a` and `b` using triple (x, y, z): open d = a - x, e = b - y.
pub fn begin_beaver_mul<P: OpenProtocol>(
    suite: &mut P,
    a: P::Share,
    b: P::Share,
    (x, y, z): (P::Share, P::Share, P::Share),
    round: &mut RoundMessages<P::Field>,
) -> BeaverMulState<P::Share> {
    let (d, e) = (a - x, b - y);
    suite.begin_open(d, round);
    suite.begin_open(e, round);
    BeaverMulState { b, x, z, d, e }
}

/// Finish multiplication: ab = z + d·b + e·x.
pub fn finish_beaver_mul<P: OpenProtocol>(
    suite: &mut P,
    state: BeaverMulState<P::Share>,
    round: &mut RoundMessages<P::Field>,
) -> Result<P::Share, MpcError> {
    let d = suite.finish_open(state.d, round)?;
    let e = suite.finish_open(state.e, round)?;
    Ok(state.z + state.b * d + state.x * e)
}
