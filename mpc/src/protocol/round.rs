use std::{collections::VecDeque, mem};

use crate::MpcError;

/// Messages broadcast during a single scheduler round.
///
/// Gates write their contributions in `begin` and read contributions of other parties
/// in `finish`. Since every party evaluates the same gates in the same order, the n-th value
/// read from a peer is the n-th value that peer broadcast in this round.
pub struct RoundMessages<F> {
    party_id: usize,
    outgoing: Vec<F>,
    incoming: Vec<VecDeque<F>>,
    uses_network: bool,
}

impl<F> RoundMessages<F> {
    /// Create empty round buffer.
    pub fn new(party_id: usize, num_parties: usize) -> Self {
        Self {
            party_id,
            outgoing: Vec::new(),
            incoming: (0..num_parties).map(|_| VecDeque::new()).collect(),
            uses_network: false,
        }
    }

    /// Queue value to be sent to all other parties.
    pub fn broadcast(&mut self, value: F) {
        self.uses_network = true;
        self.outgoing.push(value);
    }

    /// Mark round as waiting for messages from other parties.
    pub fn listen(&mut self) {
        self.uses_network = true;
    }

    /// Whether round requires network exchange.
    pub fn uses_network(&self) -> bool {
        self.uses_network
    }

    /// Take values queued for broadcast.
    pub fn take_outgoing(&mut self) -> Vec<F> {
        mem::take(&mut self.outgoing)
    }

    /// Store values received from given party.
    pub fn deliver(&mut self, from: usize, values: Vec<F>) {
        self.incoming[from] = values.into();
    }

    /// Next value broadcast by given party.
    pub fn receive(&mut self, from: usize) -> Result<F, MpcError> {
        if from == self.party_id {
            panic!("Cannot receive message on loopback");
        }
        self.incoming[from]
            .pop_front()
            .ok_or(MpcError::MissingMessage(from))
    }

    /// IDs of all other parties.
    pub fn peers(&self) -> impl Iterator<Item = usize> {
        let party_id = self.party_id;
        (0..self.incoming.len()).filter(move |&id| id != party_id)
    }
}
