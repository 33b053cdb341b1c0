//! Batched MAC check of partially opened values.
//!
//! Parties jointly toss a seed, derive random coefficients `r_j` from it and
//! reveal `σ_i = Σ r_j·m_ij − α_i·Σ r_j·v_j`. Honest shares satisfy `Σ σ_i = 0`.
//! Both the seed contributions and `σ_i` are committed to before they are revealed.

use digest::Digest;
use rand::{rngs::StdRng, thread_rng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha3::Sha3_256;
use tracing::{debug, error};

use crate::{transport::Network, MpcError, MpcField};

type Digest32 = [u8; 32];

#[derive(Debug, Deserialize, Serialize)]
#[serde(bound = "F: MpcField")]
enum CheckMessage<F> {
    Commitment(Digest32),
    SeedOpening { seed: Digest32, nonce: Digest32 },
    MacOpening { value: F, nonce: Digest32 },
}

impl<F: MpcField> CheckMessage<F> {
    /// Commitment binding the payload of an opening message.
    fn commitment(&self) -> Result<Digest32, MpcError> {
        let (payload, nonce) = match self {
            CheckMessage::Commitment(_) => panic!("Commitment message cannot be committed to"),
            CheckMessage::SeedOpening { seed, nonce } => (seed.to_vec(), nonce),
            CheckMessage::MacOpening { value, nonce } => (bincode::serialize(value)?, nonce),
        };
        Ok(Sha3_256::new()
            .chain_update(payload)
            .chain_update(nonce)
            .finalize()
            .into())
    }
}

/// Check MACs of opened values. Each item is a pair (opened value, local MAC share).
pub(crate) async fn check_macs<F, N>(
    network: &mut N,
    mac_key_share: F,
    opened: &[(F, F)],
) -> Result<(), MpcError>
where
    F: MpcField,
    N: Network,
{
    if opened.is_empty() {
        return Ok(());
    }
    debug!(openings = opened.len(), "running MAC check");

    let mut seed: Digest32 = thread_rng().gen();
    let contribution: CheckMessage<F> = CheckMessage::SeedOpening {
        seed,
        nonce: thread_rng().gen(),
    };
    for (id, msg) in commit_and_open(network, contribution).await? {
        match msg {
            CheckMessage::SeedOpening { seed: other, .. } => {
                seed.iter_mut().zip(other).for_each(|(x, y)| *x ^= y);
            }
            _ => return Err(MpcError::UnexpectedMessage(id)),
        }
    }

    let mut rng = StdRng::from_seed(seed);
    let (mac_sum, value_sum) =
        opened
            .iter()
            .fold((F::zero(), F::zero()), |(mac_sum, value_sum), &(value, mac)| {
                let coefficient = F::random(&mut rng);
                (mac_sum + coefficient * mac, value_sum + coefficient * value)
            });
    let sigma = mac_sum - mac_key_share * value_sum;

    let mut total = sigma;
    let opening = CheckMessage::MacOpening {
        value: sigma,
        nonce: thread_rng().gen(),
    };
    for (id, msg) in commit_and_open(network, opening).await? {
        match msg {
            CheckMessage::MacOpening { value, .. } => total += value,
            _ => return Err(MpcError::UnexpectedMessage(id)),
        }
    }

    if bool::from(total.is_zero()) {
        Ok(())
    } else {
        error!(openings = opened.len(), "MAC check failed");
        Err(MpcError::MacCheckFailed {
            openings: opened.len(),
        })
    }
}

/// Broadcast commitment to `opening`, then the opening itself.
/// Returns openings of all other parties after checking them against their commitments.
async fn commit_and_open<F, N>(
    network: &mut N,
    opening: CheckMessage<F>,
) -> Result<Vec<(usize, CheckMessage<F>)>, MpcError>
where
    F: MpcField,
    N: Network,
{
    let commitment: CheckMessage<F> = CheckMessage::Commitment(opening.commitment()?);
    let commitments = exchange(network, &commitment).await?;
    let openings = exchange(network, &opening).await?;

    commitments
        .into_iter()
        .zip(openings)
        .map(|((id, commitment), (opening_id, opening))| {
            if id != opening_id {
                return Err(MpcError::UnexpectedMessage(opening_id));
            }
            match (commitment, &opening) {
                (CheckMessage::Commitment(_), CheckMessage::Commitment(_)) => {
                    Err(MpcError::UnexpectedMessage(id))
                }
                (CheckMessage::Commitment(expected), _) => {
                    if opening.commitment()? == expected {
                        Ok((id, opening))
                    } else {
                        Err(MpcError::CommitmentMismatch(id))
                    }
                }
                _ => Err(MpcError::UnexpectedMessage(id)),
            }
        })
        .collect()
}

async fn exchange<F, N>(
    network: &mut N,
    msg: &CheckMessage<F>,
) -> Result<Vec<(usize, CheckMessage<F>)>, MpcError>
where
    F: MpcField,
    N: Network,
{
    let received = network.broadcast(bincode::serialize(msg)?).await?;
    received
        .into_iter()
        .map(|(id, raw)| Ok((id, bincode::deserialize(&raw)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use ff::Field;
    use futures::future::join_all;

    use super::*;
    use crate::{fields::Fp255, transport::mock_multiparty_channels};

    /// Shares of `values` under MAC key 5, with the first MAC share of party 0 shifted by `error`.
    fn shares(
        num_parties: usize,
        values: &[u64],
        error: u64,
    ) -> (Vec<Fp255>, Vec<Vec<(Fp255, Fp255)>>) {
        let key = Fp255::from(5);
        let key_shares: Vec<_> = (0..num_parties)
            .map(|id| match id {
                0 => key - Fp255::from(num_parties as u64 - 1),
                _ => Fp255::one(),
            })
            .collect();
        let opened = (0..num_parties)
            .map(|id| {
                values
                    .iter()
                    .enumerate()
                    .map(|(j, &v)| {
                        let value = Fp255::from(v);
                        let mac = if id == 0 {
                            key * value - Fp255::from(num_parties as u64 - 1) * Fp255::from(j as u64)
                                + Fp255::from(if j == 0 { error } else { 0 })
                        } else {
                            Fp255::from(j as u64)
                        };
                        (value, mac)
                    })
                    .collect()
            })
            .collect();
        (key_shares, opened)
    }

    async fn run_check(error: u64) -> Vec<Result<(), MpcError>> {
        let (key_shares, opened) = shares(3, &[4, 8, 15, 16], error);
        let mut transports = mock_multiparty_channels::<Vec<u8>>(3, 1 << 16);
        join_all(
            transports
                .iter_mut()
                .zip(key_shares)
                .zip(&opened)
                .map(|((network, key), opened)| check_macs(network, key, opened)),
        )
        .await
    }

    #[tokio::test]
    async fn test_honest_openings_pass() {
        for result in run_check(0).await {
            assert!(result.is_ok());
        }
    }

    #[tokio::test]
    async fn test_tampered_mac_is_detected() {
        for result in run_check(1).await {
            assert!(matches!(result, Err(MpcError::MacCheckFailed { openings: 4 })));
        }
    }

    #[tokio::test]
    async fn test_empty_batch_skips_communication() {
        // No peers are listening, so any communication would fail.
        let mut transports = mock_multiparty_channels::<Vec<u8>>(2, 1024);
        let result = check_macs(&mut transports[0], Fp255::one(), &[]).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_commitment_binds_payload() {
        let nonce = [9; 32];
        let a = CheckMessage::MacOpening {
            value: Fp255::from(1),
            nonce,
        };
        let b = CheckMessage::MacOpening {
            value: Fp255::from(2),
            nonce,
        };
        assert_ne!(a.commitment().unwrap(), b.commitment().unwrap());
        let c = CheckMessage::<Fp255>::SeedOpening {
            seed: [1; 32],
            nonce,
        };
        let d = CheckMessage::<Fp255>::SeedOpening {
            seed: [1; 32],
            nonce: [8; 32],
        };
        assert_ne!(c.commitment().unwrap(), d.commitment().unwrap());
    }
}
