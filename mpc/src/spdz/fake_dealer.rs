use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::fields::MpcField;
use crate::{MpcContext, MpcDealer, MpcError, PreprocessingStats};

use super::{InputMask, SpdzDealer, SpdzShare};

/// Length of exponentiation pipes produced by the fake dealer.
const FAKE_EXP_PIPE_LENGTH: usize = 8;

/// Insecure dealer for SPDZ protocol that can be used for tests.
/// Dealers created with the same seed produce consistent shares on all parties.
pub struct FakeSpdzDealer<T> {
    auth_key: FakeAuthKey<T>,
    beaver_triple_gen: FakeShareGenerator<T>,
    bits_gen: FakeShareGenerator<T>,
    exp_pipe_gen: FakeShareGenerator<T>,
    input_masks_gen: Vec<FakeShareGenerator<T>>,
    consumed: PreprocessingStats,
}

impl<T: MpcField> FakeSpdzDealer<T> {
    /// Create new instance.
    pub fn new(num_parties: usize, party_id: usize, seed: u8) -> Self {
        let mut rng = SmallRng::from_seed([seed; 32]);
        let auth_key = FakeAuthKey::random(&mut rng, party_id, num_parties);
        Self {
            auth_key,
            beaver_triple_gen: FakeShareGenerator::new(auth_key, rng.gen()),
            bits_gen: FakeShareGenerator::new(auth_key, rng.gen()),
            exp_pipe_gen: FakeShareGenerator::new(auth_key, rng.gen()),
            input_masks_gen: (0..num_parties)
                .map(|_| FakeShareGenerator::new(auth_key, rng.gen()))
                .collect(),
            consumed: PreprocessingStats::new(num_parties),
        }
    }
}

impl<T: MpcField> MpcContext for FakeSpdzDealer<T> {
    type Field = T;
    type Share = SpdzShare<T>;

    fn num_parties(&self) -> usize {
        self.auth_key.num_parties
    }

    fn party_id(&self) -> usize {
        self.auth_key.party_id
    }
}

impl<T: MpcField> MpcDealer for FakeSpdzDealer<T> {
    fn next_beaver_triple(&mut self) -> Result<(Self::Share, Self::Share, Self::Share), MpcError> {
        let (a_share, a_plain) = self.beaver_triple_gen.gen_random_authenticated_share();
        let (b_share, b_plain) = self.beaver_triple_gen.gen_random_authenticated_share();
        let c_share = self
            .beaver_triple_gen
            .gen_authenticated_share(a_plain * b_plain);
        self.consumed.triples += 1;
        Ok((a_share, b_share, c_share))
    }

    fn next_bit(&mut self) -> Result<Self::Share, MpcError> {
        let value = if self.bits_gen.rng().gen() {
            Self::Field::one()
        } else {
            Self::Field::zero()
        };
        self.consumed.bits += 1;
        Ok(self.bits_gen.gen_authenticated_share(value))
    }

    fn consumed(&self) -> PreprocessingStats {
        self.consumed.clone()
    }
}

impl<T: MpcField> SpdzDealer for FakeSpdzDealer<T> {
    fn modulus(&mut self) -> Result<Vec<u8>, MpcError> {
        Ok(T::modulus_bytes())
    }

    fn mac_key_share(&mut self) -> Result<Self::Field, MpcError> {
        Ok(self.auth_key.share_value)
    }

    fn next_exp_pipe(&mut self) -> Result<Vec<Self::Share>, MpcError> {
        let (base, inverse) = loop {
            let candidate = T::random(self.exp_pipe_gen.rng());
            if let Some(inverse) = Option::<T>::from(candidate.invert()) {
                break (candidate, inverse);
            }
        };
        let mut pipe = vec![self.exp_pipe_gen.gen_authenticated_share(inverse)];
        let mut power = T::one();
        for _ in 0..FAKE_EXP_PIPE_LENGTH {
            power *= base;
            pipe.push(self.exp_pipe_gen.gen_authenticated_share(power));
        }
        self.consumed.exp_pipes += 1;
        Ok(pipe)
    }

    fn next_input_mask(&mut self, owner: usize) -> Result<InputMask<Self::Field>, MpcError> {
        let (share, plain) = self
            .input_masks_gen
            .get_mut(owner)
            .ok_or(MpcError::UnknownParty(owner))?
            .gen_random_authenticated_share();
        self.consumed.input_masks[owner] += 1;
        Ok(InputMask {
            share,
            plain: (owner == self.auth_key.party_id).then(|| plain),
        })
    }
}

/// Authentication key in plain and its share.
#[derive(Copy, Clone)]
struct FakeAuthKey<T> {
    num_parties: usize,
    party_id: usize,
    share_value: T,
    plain_value: T,
}

impl<T: MpcField> FakeAuthKey<T> {
    /// Generate fake authentication key and its share.
    fn random(rng: &mut impl Rng, party_id: usize, num_parties: usize) -> Self {
        let (share_value, plain_value) = gen_random_raw_share(rng, party_id, num_parties);
        Self {
            num_parties,
            party_id,
            share_value,
            plain_value,
        }
    }
}

/// Insecure generator of SPDZ-shared values.
struct FakeShareGenerator<T> {
    auth_key: FakeAuthKey<T>,
    rng: SmallRng,
}

impl<T: MpcField> FakeShareGenerator<T> {
    /// Create new generator.
    fn new(auth_key: FakeAuthKey<T>, seed: [u8; 32]) -> Self {
        Self {
            rng: SmallRng::from_seed(seed),
            auth_key,
        }
    }

    /// Get underlying random number generator.
    fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Generate local unauthenticated share of specified value.
    fn gen_raw_share(&mut self, value: T) -> T {
        gen_raw_share(
            &mut self.rng,
            self.auth_key.party_id,
            self.auth_key.num_parties,
            value,
        )
    }

    /// Generate local authenticated share of specified value.
    fn gen_authenticated_share(&mut self, value: T) -> SpdzShare<T> {
        SpdzShare {
            value: self.gen_raw_share(value),
            mac: self.gen_raw_share(value * self.auth_key.plain_value),
        }
    }

    /// Generate random value and its local authenticated share.
    fn gen_random_authenticated_share(&mut self) -> (SpdzShare<T>, T) {
        let value = T::random(&mut self.rng);
        (self.gen_authenticated_share(value), value)
    }
}

/// Generate local unauthenticated share of specified value.
fn gen_raw_share<T: MpcField>(
    mut rng: &mut impl Rng,
    party_id: usize,
    num_parties: usize,
    value: T,
) -> T {
    let start = T::random(&mut rng);
    let step = T::random(&mut rng);
    let share = arithmetic_progression(start, step, party_id as u64);
    let sum = arithmetic_progression_sum(start, step, num_parties as u64);
    if party_id == 0 {
        share + value - sum
    } else {
        share
    }
}

/// Generate random value and its local unauthenticated share.
fn gen_random_raw_share<T: MpcField>(
    mut rng: &mut impl Rng,
    party_id: usize,
    num_parties: usize,
) -> (T, T) {
    let value = T::random(&mut rng);
    (gen_raw_share(rng, party_id, num_parties, value), value)
}

/// Compute n-th term of linear progression.
fn arithmetic_progression<T: MpcField>(start: T, step: T, n: u64) -> T {
    start + step * T::from(n)
}

/// Compute sum of terms 0..n-1 of linear progression.
fn arithmetic_progression_sum<T: MpcField>(start: T, step: T, n: u64) -> T {
    let sum = if n % 2 == 0 {
        T::from(n / 2) * T::from(n - 1)
    } else {
        T::from(n) * T::from((n - 1) / 2)
    };
    start * T::from(n) + step * sum
}

#[cfg(test)]
mod tests {
    use ff::Field;

    use super::*;
    use crate::fields::Fp255;

    fn dealers(num_parties: usize) -> Vec<FakeSpdzDealer<Fp255>> {
        (0..num_parties)
            .map(|id| FakeSpdzDealer::new(num_parties, id, 7))
            .collect()
    }

    fn reconstruct(shares: impl IntoIterator<Item = SpdzShare<Fp255>>) -> SpdzShare<Fp255> {
        shares
            .into_iter()
            .fold(SpdzShare::new(Fp255::zero(), Fp255::zero()), |acc, x| {
                acc + x
            })
    }

    #[test]
    fn test_shares_are_consistent() {
        let mut dealers = dealers(3);
        let key = dealers
            .iter_mut()
            .fold(Fp255::zero(), |acc, d| acc + d.mac_key_share().unwrap());

        let triples: Vec<_> = dealers
            .iter_mut()
            .map(|d| d.next_beaver_triple().unwrap())
            .collect();
        let a = reconstruct(triples.iter().map(|t| t.0));
        let b = reconstruct(triples.iter().map(|t| t.1));
        let c = reconstruct(triples.iter().map(|t| t.2));
        assert_eq!(a.value * b.value, c.value);
        assert_eq!(a.mac, key * a.value);
        assert_eq!(c.mac, key * c.value);

        let bit = reconstruct(dealers.iter_mut().map(|d| d.next_bit().unwrap()));
        assert!(bit.value == Fp255::zero() || bit.value == Fp255::one());
        assert_eq!(bit.mac, key * bit.value);
    }

    #[test]
    fn test_input_mask_plaintext_is_private() {
        let mut dealers = dealers(3);
        let masks: Vec<_> = dealers
            .iter_mut()
            .map(|d| d.next_input_mask(1).unwrap())
            .collect();
        assert!(masks[0].plain.is_none());
        assert!(masks[2].plain.is_none());
        let value = reconstruct(masks.iter().map(|m| m.share)).value;
        assert_eq!(masks[1].plain, Some(value));
        assert_eq!(dealers[0].consumed().input_masks, vec![0, 1, 0]);
    }

    #[test]
    fn test_exp_pipe() {
        let mut dealers = dealers(2);
        let pipes: Vec<_> = dealers
            .iter_mut()
            .map(|d| d.next_exp_pipe().unwrap())
            .collect();
        let values: Vec<_> = (0..=FAKE_EXP_PIPE_LENGTH)
            .map(|i| reconstruct(pipes.iter().map(|p| p[i])).value)
            .collect();
        assert_eq!(values[0] * values[1], Fp255::one());
        assert_eq!(values[1] * values[1], values[2]);
    }
}
