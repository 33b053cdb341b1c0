use async_trait::async_trait;

use crate::{
    protocol::RoundMessages,
    suite::{
        begin_beaver_mul, finish_beaver_mul, AddProtocol, BeaverMulState, InputProtocol,
        MulProtocol, OpenProtocol, ProtocolSuite,
    },
    transport::Network,
    MpcContext, MpcError, MpcField, PreprocessingStats,
};

use super::{mac_check::check_macs, SpdzDealer, SpdzShare};

pub type SpdzMulState<T> = BeaverMulState<SpdzShare<T>>;

/// State of an output to a single party.
pub struct SpdzOutputState<T> {
    receiver: usize,
    masked: SpdzShare<T>,
    mask_plain: Option<T>,
}

/// State of an input between its two phases.
pub struct SpdzInputState<T> {
    owner: usize,
    mask: SpdzShare<T>,
    delta: Option<T>,
}

/// SPDZ protocol suite of a single party and the resources it needs for a computation run.
///
/// Opened values are checked lazily: every partial opening is recorded together with the
/// local MAC share, and [`ProtocolSuite::verify`] checks all of them in a single batch.
pub struct SpdzResourcePool<T, D, N> {
    num_parties: usize,
    party_id: usize,
    security_parameter: usize,
    mac_key_share: T,
    dealer: D,
    network: N,
    opened: Vec<(T, T)>,
}

impl<T, D, N> SpdzResourcePool<T, D, N>
where
    T: MpcField,
    D: SpdzDealer<Field = T, Share = SpdzShare<T>>,
    N: Network,
{
    /// Create resource pool. Fails if dealer material was generated for a different field.
    pub fn new(mut dealer: D, network: N, security_parameter: usize) -> Result<Self, MpcError> {
        assert_eq!(
            dealer.num_parties(),
            network.num_parties(),
            "Dealer and network disagree on number of parties"
        );
        assert_eq!(
            dealer.party_id(),
            network.party_id(),
            "Dealer and network disagree on party ID"
        );
        if dealer.modulus()? != T::modulus_bytes() {
            return Err(MpcError::ModulusMismatch);
        }
        let mac_key_share = dealer.mac_key_share()?;
        Ok(Self {
            num_parties: network.num_parties(),
            party_id: network.party_id(),
            security_parameter,
            mac_key_share,
            dealer,
            network,
            opened: Vec::new(),
        })
    }

    /// Statistical security parameter of the run.
    pub fn security_parameter(&self) -> usize {
        self.security_parameter
    }

    fn ensure_party(&self, id: usize) -> Result<(), MpcError> {
        if id < self.num_parties {
            Ok(())
        } else {
            Err(MpcError::UnknownParty(id))
        }
    }

    fn reconstruct(&self, own: T, round: &mut RoundMessages<T>) -> Result<T, MpcError> {
        let peers: Vec<_> = round.peers().collect();
        peers
            .into_iter()
            .try_fold(own, |acc, peer| Ok(acc + round.receive(peer)?))
    }
}

impl<T, D, N> MpcContext for SpdzResourcePool<T, D, N>
where
    T: MpcField,
{
    type Field = T;
    type Share = SpdzShare<T>;

    fn num_parties(&self) -> usize {
        self.num_parties
    }

    fn party_id(&self) -> usize {
        self.party_id
    }
}

impl<T, D, N> AddProtocol for SpdzResourcePool<T, D, N>
where
    T: MpcField,
{
    fn add_public(&self, a: Self::Share, k: T) -> Self::Share {
        SpdzShare {
            value: if self.party_id == 0 { a.value + k } else { a.value },
            mac: a.mac + k * self.mac_key_share,
        }
    }
}

impl<T, D, N> MulProtocol for SpdzResourcePool<T, D, N>
where
    T: MpcField,
    D: SpdzDealer<Field = T, Share = SpdzShare<T>>,
    N: Network,
{
    type MulState = SpdzMulState<T>;

    fn begin_mul(
        &mut self,
        a: Self::Share,
        b: Self::Share,
        round: &mut RoundMessages<T>,
    ) -> Result<Self::MulState, MpcError> {
        let triple = self.dealer.next_beaver_triple()?;
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

impl<T, D, N> OpenProtocol for SpdzResourcePool<T, D, N>
where
    T: MpcField,
    D: SpdzDealer<Field = T, Share = SpdzShare<T>>,
    N: Network,
{
    type OutputState = SpdzOutputState<T>;

    fn begin_open(&mut self, a: Self::Share, round: &mut RoundMessages<T>) {
        round.broadcast(a.value);
    }

    fn finish_open(&mut self, a: Self::Share, round: &mut RoundMessages<T>) -> Result<T, MpcError> {
        let value = self.reconstruct(a.value, round)?;
        self.opened.push((value, a.mac));
        Ok(value)
    }

    fn begin_output(
        &mut self,
        receiver: usize,
        a: Self::Share,
        round: &mut RoundMessages<T>,
    ) -> Result<Self::OutputState, MpcError> {
        self.ensure_party(receiver)?;
        let mask = self.dealer.next_input_mask(receiver)?;
        let masked = a + mask.share;
        self.begin_open(masked, round);
        Ok(SpdzOutputState {
            receiver,
            masked,
            mask_plain: mask.plain,
        })
    }

    fn finish_output(
        &mut self,
        state: Self::OutputState,
        round: &mut RoundMessages<T>,
    ) -> Result<Option<T>, MpcError> {
        let value = self.finish_open(state.masked, round)?;
        if state.receiver != self.party_id {
            return Ok(None);
        }
        let mask = state
            .mask_plain
            .expect("Input mask toward current party has no plaintext");
        Ok(Some(value - mask))
    }
}

impl<T, D, N> InputProtocol for SpdzResourcePool<T, D, N>
where
    T: MpcField,
    D: SpdzDealer<Field = T, Share = SpdzShare<T>>,
    N: Network,
{
    type InputState = SpdzInputState<T>;

    fn begin_input(
        &mut self,
        owner: usize,
        value: Option<T>,
        round: &mut RoundMessages<T>,
    ) -> Result<Self::InputState, MpcError> {
        self.ensure_party(owner)?;
        let mask = self.dealer.next_input_mask(owner)?;
        let delta = if owner == self.party_id {
            let value = value.ok_or(MpcError::MissingInput(owner))?;
            let plain = mask
                .plain
                .expect("Input mask toward current party has no plaintext");
            let delta = value - plain;
            round.broadcast(delta);
            Some(delta)
        } else {
            round.listen();
            None
        };
        Ok(SpdzInputState {
            owner,
            mask: mask.share,
            delta,
        })
    }

    fn finish_input(
        &mut self,
        state: Self::InputState,
        round: &mut RoundMessages<T>,
    ) -> Result<Self::Share, MpcError> {
        let delta = match state.delta {
            Some(delta) => delta,
            None => round.receive(state.owner)?,
        };
        Ok(self.add_public(state.mask, delta))
    }
}

#[async_trait(?Send)]
impl<T, D, N> ProtocolSuite for SpdzResourcePool<T, D, N>
where
    T: MpcField,
    D: SpdzDealer<Field = T, Share = SpdzShare<T>> + 'static,
    N: Network + 'static,
{
    fn random_bit(&mut self) -> Result<Self::Share, MpcError> {
        self.dealer.next_bit()
    }

    async fn exchange(&mut self, round: &mut RoundMessages<T>) -> Result<(), MpcError> {
        let outgoing = bincode::serialize(&round.take_outgoing())?;
        for (from, raw) in self.network.broadcast(outgoing).await? {
            round.deliver(from, bincode::deserialize(&raw)?);
        }
        Ok(())
    }

    async fn verify(&mut self) -> Result<(), MpcError> {
        check_macs(&mut self.network, self.mac_key_share, &self.opened).await?;
        self.opened.clear();
        Ok(())
    }

    fn preprocessing_stats(&self) -> PreprocessingStats {
        self.dealer.consumed()
    }
}
