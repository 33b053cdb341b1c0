use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::error;

use crate::{
    storage::{
        input_storage_key, mac_key_share_key, StorageError, StreamedStorage, BIT_STORAGE,
        EXP_PIPE_STORAGE, MODULUS_KEY, TRIPLE_STORAGE,
    },
    MpcContext, MpcDealer, MpcError, MpcField, PreprocessingStats,
};

use super::{InputMask, SpdzDealer, SpdzShare};

/// SPDZ dealer reading preprocessed material from streamed storage.
///
/// Every item is read exactly once. Running out of material is fatal, since the amount
/// needed by a circuit is known in advance.
pub struct SpdzDataSupplier<T, St> {
    storage: St,
    prefix: String,
    num_parties: usize,
    party_id: usize,
    consumed: PreprocessingStats,
    modulus: Option<Vec<u8>>,
    mac_key_share: Option<T>,
    _phantom: PhantomData<T>,
}

impl<T, St> SpdzDataSupplier<T, St>
where
    T: MpcField,
    St: StreamedStorage,
{
    /// Create supplier reading streams with given key prefix.
    pub fn new(storage: St, prefix: impl Into<String>, num_parties: usize, party_id: usize) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            num_parties,
            party_id,
            consumed: PreprocessingStats::new(num_parties),
            modulus: None,
            mac_key_share: None,
            _phantom: PhantomData,
        }
    }

    fn read<V: DeserializeOwned>(&mut self, key: &str, index: usize) -> Result<V, MpcError> {
        match self.storage.get_next_item(key) {
            Ok(item) => Ok(item),
            Err(StorageError::Exhausted(category)) => {
                error!(
                    party_id = self.party_id,
                    %category, index, "preprocessed material exhausted"
                );
                Err(MpcError::PreprocessingExhausted { category, index })
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl<T, St> MpcContext for SpdzDataSupplier<T, St>
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

impl<T, St> MpcDealer for SpdzDataSupplier<T, St>
where
    T: MpcField,
    St: StreamedStorage,
{
    fn next_beaver_triple(&mut self) -> Result<(Self::Share, Self::Share, Self::Share), MpcError> {
        let key = format!("{}{TRIPLE_STORAGE}", self.prefix);
        let triple = self.read(&key, self.consumed.triples)?;
        self.consumed.triples += 1;
        Ok(triple)
    }

    fn next_bit(&mut self) -> Result<Self::Share, MpcError> {
        let key = format!("{}{BIT_STORAGE}", self.prefix);
        let bit = self.read(&key, self.consumed.bits)?;
        self.consumed.bits += 1;
        Ok(bit)
    }

    fn consumed(&self) -> PreprocessingStats {
        self.consumed.clone()
    }
}

impl<T, St> SpdzDealer for SpdzDataSupplier<T, St>
where
    T: MpcField,
    St: StreamedStorage,
{
    fn modulus(&mut self) -> Result<Vec<u8>, MpcError> {
        if let Some(modulus) = &self.modulus {
            return Ok(modulus.clone());
        }
        let modulus: Vec<u8> = self.read(MODULUS_KEY, 0)?;
        self.modulus = Some(modulus.clone());
        Ok(modulus)
    }

    fn mac_key_share(&mut self) -> Result<Self::Field, MpcError> {
        if let Some(key) = self.mac_key_share {
            return Ok(key);
        }
        let key = self.read(&mac_key_share_key(self.party_id), 0)?;
        self.mac_key_share = Some(key);
        Ok(key)
    }

    fn next_exp_pipe(&mut self) -> Result<Vec<Self::Share>, MpcError> {
        let key = format!("{}{EXP_PIPE_STORAGE}", self.prefix);
        let pipe = self.read(&key, self.consumed.exp_pipes)?;
        self.consumed.exp_pipes += 1;
        Ok(pipe)
    }

    fn next_input_mask(&mut self, owner: usize) -> Result<InputMask<Self::Field>, MpcError> {
        let index = *self
            .consumed
            .input_masks
            .get(owner)
            .ok_or(MpcError::UnknownParty(owner))?;
        let mask = self.read(&input_storage_key(&self.prefix, owner), index)?;
        self.consumed.input_masks[owner] += 1;
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use ff::Field;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        fields::Fp255,
        spdz::{generate_preprocessing, PreprocessingCounts},
        storage::InMemoryStorage,
    };

    fn suppliers(counts: &PreprocessingCounts) -> Vec<SpdzDataSupplier<Fp255, InMemoryStorage>> {
        let rng = StdRng::seed_from_u64(1);
        generate_preprocessing::<Fp255, _>(2, "run_", counts, rng)
            .unwrap()
            .into_iter()
            .enumerate()
            .map(|(id, storage)| SpdzDataSupplier::new(storage, "run_", 2, id))
            .collect()
    }

    #[test]
    fn test_triples_are_never_replayed() {
        let counts = PreprocessingCounts {
            triples: 2,
            ..Default::default()
        };
        let mut supplier = suppliers(&counts).remove(0);

        let first = supplier.next_beaver_triple().unwrap();
        let second = supplier.next_beaver_triple().unwrap();
        assert_ne!(first, second);
        assert_eq!(supplier.consumed().triples, 2);

        assert!(matches!(
            supplier.next_beaver_triple(),
            Err(MpcError::PreprocessingExhausted { index: 2, .. })
        ));
        // Counter is not advanced on failure.
        assert_eq!(supplier.consumed().triples, 2);
    }

    #[test]
    fn test_input_mask_toward_unknown_party() {
        let counts = PreprocessingCounts {
            input_masks: 1,
            ..Default::default()
        };
        let mut supplier = suppliers(&counts).remove(0);
        assert!(matches!(
            supplier.next_input_mask(2),
            Err(MpcError::UnknownParty(2))
        ));
        assert!(supplier.next_input_mask(1).is_ok());
    }

    #[test]
    fn test_exhausted_categories_are_independent() {
        let counts = PreprocessingCounts {
            bits: 1,
            input_masks: 1,
            ..Default::default()
        };
        let mut supplier = suppliers(&counts).remove(1);

        assert!(supplier.next_bit().is_ok());
        assert!(supplier.next_bit().is_err());
        assert!(supplier.next_exp_pipe().is_err());
        assert!(supplier.next_input_mask(0).is_ok());
        assert!(supplier.next_input_mask(0).is_err());
        assert!(supplier.next_input_mask(1).is_ok());
        assert_eq!(supplier.consumed().input_masks, vec![1, 1]);
    }

    #[test]
    fn test_scalars_are_cached() {
        let mut supplier = suppliers(&PreprocessingCounts::default()).remove(0);
        let key = supplier.mac_key_share().unwrap();
        // Storage holds a single copy of each scalar.
        assert_eq!(supplier.mac_key_share().unwrap(), key);
        assert_eq!(supplier.modulus().unwrap(), Fp255::modulus_bytes());
        assert_eq!(supplier.modulus().unwrap(), Fp255::modulus_bytes());
    }

    #[test]
    fn test_generated_shares_reconstruct() {
        let counts = PreprocessingCounts {
            triples: 1,
            exp_pipes: 1,
            exp_pipe_length: 3,
            input_masks: 1,
            ..Default::default()
        };
        let mut suppliers = suppliers(&counts);
        let key = suppliers
            .iter_mut()
            .fold(Fp255::zero(), |acc, s| acc + s.mac_key_share().unwrap());
        let sum = |shares: Vec<SpdzShare<Fp255>>| {
            shares
                .into_iter()
                .fold(SpdzShare::new(Fp255::zero(), Fp255::zero()), |acc, x| acc + x)
        };

        let triples: Vec<_> = suppliers
            .iter_mut()
            .map(|s| s.next_beaver_triple().unwrap())
            .collect();
        let a = sum(triples.iter().map(|t| t.0).collect());
        let b = sum(triples.iter().map(|t| t.1).collect());
        let c = sum(triples.iter().map(|t| t.2).collect());
        assert_eq!(a.value * b.value, c.value);
        assert_eq!(c.mac, key * c.value);

        let pipes: Vec<_> = suppliers
            .iter_mut()
            .map(|s| s.next_exp_pipe().unwrap())
            .collect();
        assert_eq!(pipes[0].len(), 4);
        let inverse = sum(pipes.iter().map(|p| p[0]).collect()).value;
        let base = sum(pipes.iter().map(|p| p[1]).collect()).value;
        assert_eq!(inverse * base, Fp255::one());

        let masks: Vec<_> = suppliers
            .iter_mut()
            .map(|s| s.next_input_mask(1).unwrap())
            .collect();
        assert_eq!(masks[0].plain, None);
        assert_eq!(
            masks[1].plain,
            Some(sum(masks.iter().map(|m| m.share).collect()).value)
        );
    }
}
