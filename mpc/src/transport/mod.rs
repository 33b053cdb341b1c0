mod multiparty;

pub use multiparty::*;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio_serde::formats::Bincode;
use tokio_util::codec::LengthDelimitedCodec;

/// Error type for channels.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Error while sending message to {0}")]
    Send(usize),
    #[error("Error while receiving message from {0}")]
    Recv(usize),
}

/// Point-to-point and broadcast messaging between parties of a run.
#[async_trait(?Send)]
pub trait Network {
    /// Number of parties participating in multi-party protocol.
    fn num_parties(&self) -> usize;

    /// ID of current party.
    fn party_id(&self) -> usize;

    /// Send message to party with given ID.
    async fn send(&mut self, to: usize, msg: Vec<u8>) -> Result<(), TransportError>;

    /// Receive message from party with given ID.
    async fn receive(&mut self, from: usize) -> Result<Vec<u8>, TransportError>;

    /// Send message to all peers and collect one message from each of them.
    async fn broadcast(&mut self, msg: Vec<u8>) -> Result<Vec<(usize, Vec<u8>)>, TransportError>;
}

/// Length-framed Bincode-encoded messages channel.
pub type BincodeStreamSink<T, C> =
    tokio_serde::Framed<tokio_util::codec::Framed<C, LengthDelimitedCodec>, T, T, Bincode<T, T>>;

/// Length-framed Bincode-encoded tokio's Duplex stream.
pub type BincodeDuplex<T> = BincodeStreamSink<T, DuplexStream>;

/// Create length-framed Bincode-encoded message channel from AsyncRead/Write.
pub fn wrap_channel_with_bincode<T, C>(channel: C) -> BincodeStreamSink<T, C>
where
    C: AsyncRead + AsyncWrite,
{
    let length_delimited = tokio_util::codec::Framed::new(channel, LengthDelimitedCodec::new());
    tokio_serde::Framed::new(length_delimited, Bincode::default())
}

/// Create bidirectional Bincode-encoded channel.
pub fn bincode_duplex<T>(max_buf_size: usize) -> (BincodeDuplex<T>, BincodeDuplex<T>) {
    let (a, b) = tokio::io::duplex(max_buf_size);
    (wrap_channel_with_bincode(a), wrap_channel_with_bincode(b))
}
