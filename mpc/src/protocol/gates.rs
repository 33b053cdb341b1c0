use crate::{suite::ProtocolSuite, MpcError};

use super::{PublicWire, RoundMessages, SecretWire, WireStore};

/// Atomic step of a circuit.
///
/// Gates pulled in the same batch are independent: none of them reads a wire written by another.
pub trait Gate<S: ProtocolSuite> {
    /// Read inputs and queue messages for the round exchange.
    fn begin(
        &mut self,
        _suite: &mut S,
        _wires: &WireStore<S::Share>,
        _round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        Ok(())
    }

    /// Consume received messages and write outputs.
    fn finish(
        &mut self,
        suite: &mut S,
        wires: &mut WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError>;

    /// Whether deferred integrity checks must be flushed after this gate.
    fn requests_verification(&self) -> bool {
        false
    }
}

/// Local function of shares and public values.
pub type LocalFn<S> = Box<
    dyn Fn(
        &S,
        &[<S as crate::MpcContext>::Share],
        &[<S as crate::MpcContext>::Field],
    ) -> <S as crate::MpcContext>::Share,
>;

/// Local function of public values.
pub type PublicFn<F> = Box<dyn Fn(&[F]) -> F>;

/// Public linear combination of shares plus public constant.
pub(crate) struct LinearGate<S: ProtocolSuite> {
    pub terms: Vec<(S::Field, SecretWire)>,
    pub constant: S::Field,
    pub out: SecretWire,
}

impl<S: ProtocolSuite> Gate<S> for LinearGate<S> {
    fn finish(
        &mut self,
        suite: &mut S,
        wires: &mut WireStore<S::Share>,
        _round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let mut result = suite.share_plain(self.constant);
        for &(coeff, wire) in &self.terms {
            result = suite.add(result, wires.secret(wire)? * coeff);
        }
        wires.set_secret(self.out, result);
        Ok(())
    }
}

pub(crate) struct MulGate<S: ProtocolSuite> {
    pub a: SecretWire,
    pub b: SecretWire,
    pub out: SecretWire,
    pub state: Option<S::MulState>,
}

impl<S: ProtocolSuite> Gate<S> for MulGate<S> {
    fn begin(
        &mut self,
        suite: &mut S,
        wires: &WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let (a, b) = (wires.secret(self.a)?, wires.secret(self.b)?);
        self.state = Some(suite.begin_mul(a, b, round)?);
        Ok(())
    }

    fn finish(
        &mut self,
        suite: &mut S,
        wires: &mut WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let state = self.state.take().expect("Gate finished before it began");
        wires.set_secret(self.out, suite.finish_mul(state, round)?);
        Ok(())
    }
}

pub(crate) struct OpenGate<S: ProtocolSuite> {
    pub input: SecretWire,
    pub out: PublicWire,
    pub share: Option<S::Share>,
}

impl<S: ProtocolSuite> Gate<S> for OpenGate<S> {
    fn begin(
        &mut self,
        suite: &mut S,
        wires: &WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let share = wires.secret(self.input)?;
        suite.begin_open(share, round);
        self.share = Some(share);
        Ok(())
    }

    fn finish(
        &mut self,
        suite: &mut S,
        wires: &mut WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let share = self.share.take().expect("Gate finished before it began");
        let value = suite.finish_open(share, round)?;
        wires.set_public(self.out, Some(value));
        Ok(())
    }
}

pub(crate) struct OutputGate<S: ProtocolSuite> {
    pub receiver: usize,
    pub input: SecretWire,
    pub out: PublicWire,
    pub state: Option<S::OutputState>,
}

impl<S: ProtocolSuite> Gate<S> for OutputGate<S> {
    fn begin(
        &mut self,
        suite: &mut S,
        wires: &WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let share = wires.secret(self.input)?;
        self.state = Some(suite.begin_output(self.receiver, share, round)?);
        Ok(())
    }

    fn finish(
        &mut self,
        suite: &mut S,
        wires: &mut WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let state = self.state.take().expect("Gate finished before it began");
        wires.set_public(self.out, suite.finish_output(state, round)?);
        Ok(())
    }
}

pub(crate) struct InputGate<S: ProtocolSuite> {
    pub owner: usize,
    pub value: Option<S::Field>,
    pub out: SecretWire,
    pub state: Option<S::InputState>,
}

impl<S: ProtocolSuite> Gate<S> for InputGate<S> {
    fn begin(
        &mut self,
        suite: &mut S,
        _wires: &WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        self.state = Some(suite.begin_input(self.owner, self.value.take(), round)?);
        Ok(())
    }

    fn finish(
        &mut self,
        suite: &mut S,
        wires: &mut WireStore<S::Share>,
        round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let state = self.state.take().expect("Gate finished before it began");
        wires.set_secret(self.out, suite.finish_input(state, round)?);
        Ok(())
    }
}

pub(crate) struct RandomBitGate {
    pub out: SecretWire,
}

impl<S: ProtocolSuite> Gate<S> for RandomBitGate {
    fn finish(
        &mut self,
        suite: &mut S,
        wires: &mut WireStore<S::Share>,
        _round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        wires.set_secret(self.out, suite.random_bit()?);
        Ok(())
    }
}

pub(crate) struct LocalGate<S: ProtocolSuite> {
    pub secrets: Vec<SecretWire>,
    pub publics: Vec<PublicWire>,
    pub func: LocalFn<S>,
    pub out: SecretWire,
}

impl<S: ProtocolSuite> Gate<S> for LocalGate<S> {
    fn finish(
        &mut self,
        suite: &mut S,
        wires: &mut WireStore<S::Share>,
        _round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let secrets = wires.secrets(&self.secrets)?;
        let publics = wires.publics(&self.publics)?;
        wires.set_secret(self.out, (self.func)(suite, &secrets, &publics));
        Ok(())
    }
}

pub(crate) struct PublicMapGate<S: ProtocolSuite> {
    pub inputs: Vec<PublicWire>,
    pub func: PublicFn<S::Field>,
    pub out: PublicWire,
}

impl<S: ProtocolSuite> Gate<S> for PublicMapGate<S> {
    fn finish(
        &mut self,
        _suite: &mut S,
        wires: &mut WireStore<S::Share>,
        _round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        let inputs = wires.publics(&self.inputs)?;
        wires.set_public(self.out, Some((self.func)(&inputs)));
        Ok(())
    }
}

/// Point at which all values opened so far must pass the integrity check.
pub(crate) struct CheckpointGate;

impl<S: ProtocolSuite> Gate<S> for CheckpointGate {
    fn finish(
        &mut self,
        _suite: &mut S,
        _wires: &mut WireStore<S::Share>,
        _round: &mut RoundMessages<S::Field>,
    ) -> Result<(), MpcError> {
        Ok(())
    }

    fn requests_verification(&self) -> bool {
        true
    }
}
