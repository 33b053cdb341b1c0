use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream},
    FutureExt, Sink, SinkExt, Stream, StreamExt, TryFutureExt,
};
use serde::{de::DeserializeOwned, Serialize};

use super::{bincode_duplex, BincodeDuplex, Network, TransportError};

/// Wrapper for peer-to-peer connections in multi-party protocol.
pub struct MultipartyTransport<T, Channel> {
    channels: Vec<Option<(SplitSink<Channel, T>, SplitStream<Channel>)>>,
    party_id: usize,
}

impl<T, Channel> MultipartyTransport<T, Channel>
where
    Channel: Stream + Sink<T>,
{
    /// Create wrapper for given list of connections. All channels but party_id should be present.
    pub fn new(channels: impl IntoIterator<Item = Option<Channel>>, party_id: usize) -> Self {
        // We split streams into unidirectional halves. This allows us to
        // asynchronously wait on both receives and sends without bothering borrow checker.
        let channels: Vec<_> = channels.into_iter().map(|x| x.map(|x| x.split())).collect();
        for (j, channel) in channels.iter().enumerate() {
            if j != party_id && channel.is_none() {
                panic!("Channel missing for party {}", j);
            }
        }
        Self { channels, party_id }
    }
}

impl<T, Channel> MultipartyTransport<T, Channel> {
    /// Number of parties participating in multi-party protocol.
    pub fn num_parties(&self) -> usize {
        self.channels.len()
    }

    /// ID of current party.
    pub fn party_id(&self) -> usize {
        self.party_id
    }

    fn channel_mut(
        &mut self,
        other_id: usize,
    ) -> &mut (SplitSink<Channel, T>, SplitStream<Channel>) {
        if other_id == self.party_id {
            panic!("Cannot use loopback channel");
        }
        match self.channels[other_id].as_mut() {
            Some(channel) => channel,
            None => panic!("Channel missing for party {}", other_id),
        }
    }

    fn peers_mut(
        &mut self,
    ) -> impl Iterator<Item = (usize, &mut (SplitSink<Channel, T>, SplitStream<Channel>))> {
        self.channels
            .iter_mut()
            .enumerate()
            .filter_map(|(id, channel)| channel.as_mut().map(|channel| (id, channel)))
    }
}

impl<T, E, Channel> MultipartyTransport<T, Channel>
where
    T: Clone,
    Channel: Stream<Item = Result<T, E>> + Sink<T> + Unpin,
{
    /// Send message to party with given ID.
    pub async fn send_to(&mut self, other_id: usize, msg: T) -> Result<(), TransportError> {
        let (sink, _) = self.channel_mut(other_id);
        sink.send(msg)
            .await
            .map_err(|_| TransportError::Send(other_id))
    }

    /// Receive message from party with given ID.
    pub async fn receive_from(&mut self, other_id: usize) -> Result<T, TransportError> {
        let (_, stream) = self.channel_mut(other_id);
        match stream.next().await {
            Some(Ok(msg)) => Ok(msg),
            _ => Err(TransportError::Recv(other_id)),
        }
    }

    /// Concurrently send and receive messages from all parties.
    pub async fn exchange_with_all(&mut self, msg: T) -> Result<Vec<(usize, T)>, TransportError> {
        futures::future::try_join_all(self.peers_mut().map(|(id, (sink, stream))| {
            let send_future = sink
                .send(msg.clone())
                .then(move |x| async move { x.map_err(|_| TransportError::Send(id)) });
            let recv_future = stream.next().then(move |raw| async move {
                match raw {
                    Some(Ok(msg)) => Ok((id, msg)),
                    _ => Err(TransportError::Recv(id)),
                }
            });
            futures::future::try_join(send_future, recv_future)
                .and_then(|(_, received_msg)| async { Ok(received_msg) })
        }))
        .await
    }
}

#[async_trait(?Send)]
impl<E, Channel> Network for MultipartyTransport<Vec<u8>, Channel>
where
    Channel: Stream<Item = Result<Vec<u8>, E>> + Sink<Vec<u8>> + Unpin,
{
    fn num_parties(&self) -> usize {
        self.channels.len()
    }

    fn party_id(&self) -> usize {
        self.party_id
    }

    async fn send(&mut self, to: usize, msg: Vec<u8>) -> Result<(), TransportError> {
        self.send_to(to, msg).await
    }

    async fn receive(&mut self, from: usize) -> Result<Vec<u8>, TransportError> {
        self.receive_from(from).await
    }

    async fn broadcast(&mut self, msg: Vec<u8>) -> Result<Vec<(usize, Vec<u8>)>, TransportError> {
        self.exchange_with_all(msg).await
    }
}

/// Create in-process channels for testing multiparty protocols.
pub fn mock_multiparty_channels<T>(
    num_parties: usize,
    max_buf_size: usize,
) -> Vec<MultipartyTransport<T, BincodeDuplex<T>>>
where
    T: Clone + Serialize + DeserializeOwned + Unpin,
{
    let mut matrix: Vec<Vec<_>> = (0..num_parties)
        .map(|_| (0..num_parties).map(|_| None).collect())
        .collect();

    for i in 0..num_parties {
        for j in 0..i {
            let (a, b) = bincode_duplex::<T>(max_buf_size);
            matrix[i][j] = Some(a);
            matrix[j][i] = Some(b);
        }
    }

    matrix
        .into_iter()
        .enumerate()
        .map(|(id, row)| MultipartyTransport::new(row, id))
        .collect()
}
