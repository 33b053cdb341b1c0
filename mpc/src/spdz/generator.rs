use rand::Rng;
use tracing::info;

use crate::{
    storage::{
        input_storage_key, mac_key_share_key, InMemoryStorage, StorageError, BIT_STORAGE,
        EXP_PIPE_STORAGE, MODULUS_KEY, TRIPLE_STORAGE,
    },
    MpcField, MpcShare,
};

use super::{InputMask, SpdzShare};

/// Amounts of preprocessed material to generate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreprocessingCounts {
    pub triples: usize,
    pub bits: usize,
    /// Number of input masks toward each party.
    pub input_masks: usize,
    pub exp_pipes: usize,
    /// Highest power contained in exponentiation pipes.
    pub exp_pipe_length: usize,
}

/// Trusted generator of random SPDZ sharings.
pub struct PreprocessingGenerator<T, R> {
    num_parties: usize,
    auth_key: T,
    rng: R,
}

impl<T, R> PreprocessingGenerator<T, R>
where
    T: MpcField,
    R: Rng,
{
    /// Create generator for given global MAC key.
    pub fn new(num_parties: usize, auth_key: T, rng: R) -> Self {
        assert!(num_parties > 0, "at least one party is required");
        Self {
            num_parties,
            auth_key,
            rng,
        }
    }

    /// Generate random sharing of given value.
    pub fn share(&mut self, value: T) -> Vec<SpdzShare<T>> {
        let mut shares: Vec<_> = (1..self.num_parties)
            .map(|_| SpdzShare {
                value: T::random(&mut self.rng),
                mac: T::random(&mut self.rng),
            })
            .collect();
        let sum = shares.iter().fold(SpdzShare::zero(), |acc, &x| acc + x);
        shares.push(SpdzShare {
            value: value - sum.value,
            mac: value * self.auth_key - sum.mac,
        });
        shares
    }

    /// Generate random sharing of random value.
    pub fn share_random(&mut self) -> (Vec<SpdzShare<T>>, T) {
        let value = T::random(&mut self.rng);
        (self.share(value), value)
    }

    /// Generate random sharing of random bit.
    pub fn share_random_bit(&mut self) -> (Vec<SpdzShare<T>>, T) {
        let value = T::from(self.rng.gen_range(0..=1));
        (self.share(value), value)
    }

    /// Generate beaver triples and append them to party storages.
    pub fn fill_beaver_triples(
        &mut self,
        storages: &mut [InMemoryStorage],
        key: &str,
        count: usize,
    ) -> Result<(), StorageError> {
        for _ in 0..count {
            let (shares_a, a) = self.share_random();
            let (shares_b, b) = self.share_random();
            let shares_ab = self.share(a * b);
            for (i, storage) in storages.iter_mut().enumerate() {
                storage.append_item(key, &(shares_a[i], shares_b[i], shares_ab[i]))?;
            }
        }
        Ok(())
    }

    /// Generate random bits and append them to party storages.
    pub fn fill_random_bits(
        &mut self,
        storages: &mut [InMemoryStorage],
        key: &str,
        count: usize,
    ) -> Result<(), StorageError> {
        for _ in 0..count {
            let (shares, _) = self.share_random_bit();
            for (storage, share) in storages.iter_mut().zip(&shares) {
                storage.append_item(key, share)?;
            }
        }
        Ok(())
    }

    /// Generate pipes [r^-1, r, ..., r^length] and append them to party storages.
    pub fn fill_exp_pipes(
        &mut self,
        storages: &mut [InMemoryStorage],
        key: &str,
        count: usize,
        length: usize,
    ) -> Result<(), StorageError> {
        for _ in 0..count {
            let (base, inverse) = loop {
                let candidate = T::random(&mut self.rng);
                if let Some(inverse) = Option::<T>::from(candidate.invert()) {
                    break (candidate, inverse);
                }
            };
            let mut pipes = vec![Vec::with_capacity(length + 1); self.num_parties];
            let mut power = T::one();
            for exponent in 0..=length {
                let value = if exponent == 0 {
                    inverse
                } else {
                    power *= base;
                    power
                };
                for (pipe, share) in pipes.iter_mut().zip(self.share(value)) {
                    pipe.push(share);
                }
            }
            for (storage, pipe) in storages.iter_mut().zip(&pipes) {
                storage.append_item(key, pipe)?;
            }
        }
        Ok(())
    }

    /// Generate input masks for given party and append them to party storages.
    pub fn fill_input_masks_for(
        &mut self,
        storages: &mut [InMemoryStorage],
        key: &str,
        owner: usize,
        count: usize,
    ) -> Result<(), StorageError> {
        for _ in 0..count {
            let (shares, plain) = self.share_random();
            for (i, storage) in storages.iter_mut().enumerate() {
                let mask = InputMask {
                    share: shares[i],
                    plain: (i == owner).then(|| plain),
                };
                storage.append_item(key, &mask)?;
            }
        }
        Ok(())
    }
}

/// Generate MAC key and preprocessed material for all parties.
/// Returns storage of every party, indexed by party ID.
pub fn generate_preprocessing<T, R>(
    num_parties: usize,
    prefix: &str,
    counts: &PreprocessingCounts,
    mut rng: R,
) -> Result<Vec<InMemoryStorage>, StorageError>
where
    T: MpcField,
    R: Rng,
{
    let key_shares: Vec<T> = (0..num_parties).map(|_| T::random(&mut rng)).collect();
    let auth_key = key_shares.iter().fold(T::zero(), |acc, &x| acc + x);

    let mut storages = vec![InMemoryStorage::new(); num_parties];
    for (id, (storage, key_share)) in storages.iter_mut().zip(&key_shares).enumerate() {
        storage.append_item(MODULUS_KEY, &T::modulus_bytes())?;
        storage.append_item(&mac_key_share_key(id), key_share)?;
    }

    let mut generator = PreprocessingGenerator::new(num_parties, auth_key, rng);

    info!(count = counts.triples, "generating beaver triples");
    generator.fill_beaver_triples(
        &mut storages,
        &format!("{prefix}{TRIPLE_STORAGE}"),
        counts.triples,
    )?;

    info!(count = counts.bits, "generating random bits");
    generator.fill_random_bits(&mut storages, &format!("{prefix}{BIT_STORAGE}"), counts.bits)?;

    info!(
        count = counts.exp_pipes,
        length = counts.exp_pipe_length,
        "generating exponentiation pipes"
    );
    generator.fill_exp_pipes(
        &mut storages,
        &format!("{prefix}{EXP_PIPE_STORAGE}"),
        counts.exp_pipes,
        counts.exp_pipe_length,
    )?;

    info!(count = counts.input_masks, "generating input masks for each party");
    for owner in 0..num_parties {
        generator.fill_input_masks_for(
            &mut storages,
            &input_storage_key(prefix, owner),
            owner,
            counts.input_masks,
        )?;
    }

    Ok(storages)
}
