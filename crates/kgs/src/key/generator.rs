use crate::{Error, RandSource, Result, ThreadRandom};

/// Characters a key may contain.
///
/// 62 symbols: a 4 character key has `62^4` (~14.7 million) variations.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Key length used when none is configured.
pub const DEFAULT_KEY_LENGTH: usize = 4;

/// A pooled key. Keys carry no meaning beyond exact string equality.
pub type Key = String;

/// Produces fixed-length random keys drawn from [`ALPHABET`].
///
/// The generator holds no mutable state; every call samples the injected
/// [`RandSource`] `length` times. It is cheap to clone, and a fill gives each
/// worker its own instance.
///
/// # Example
/// ```
/// use kgs::{ALPHABET, KeyGenerator, ThreadRandom};
///
/// let generator = KeyGenerator::new(6, ThreadRandom).unwrap();
/// let key = generator.generate();
/// assert_eq!(key.len(), 6);
/// assert!(key.bytes().all(|b| ALPHABET.contains(&b)));
/// ```
#[derive(Clone, Debug)]
pub struct KeyGenerator<R = ThreadRandom> {
    length: usize,
    rng: R,
}

impl<R: RandSource> KeyGenerator<R> {
    /// Creates a generator for keys of `length` characters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLength`] if `length` is zero.
    pub fn new(length: usize, rng: R) -> Result<Self> {
        if length == 0 {
            return Err(Error::InvalidLength { length });
        }
        Ok(Self { length, rng })
    }

    /// The number of characters in every generated key.
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Generates one candidate key.
    ///
    /// Uniqueness is not guaranteed here; callers deduplicate against a
    /// [`Repository`](crate::Repository).
    pub fn generate(&self) -> Key {
        (0..self.length)
            .map(|_| char::from(ALPHABET[self.rng.next_index(ALPHABET.len())]))
            .collect()
    }
}

/// Generates a single key of `length` characters using [`ThreadRandom`].
///
/// # Errors
///
/// Returns [`Error::InvalidLength`] if `length` is zero.
pub fn generate_key(length: usize) -> Result<Key> {
    KeyGenerator::new(length, ThreadRandom).map(|g| g.generate())
}

/// Number of distinct keys of `length` characters, or `None` if it does not
/// fit in a `u64`.
pub fn key_space(length: usize) -> Option<u64> {
    let length = u32::try_from(length).ok()?;
    (ALPHABET.len() as u64).checked_pow(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Walks through the alphabet one index per call.
    #[derive(Default)]
    struct SequenceRand {
        next: AtomicUsize,
    }

    impl RandSource for SequenceRand {
        fn next_index(&self, upper: usize) -> usize {
            self.next.fetch_add(1, Ordering::Relaxed) % upper
        }
    }

    #[test]
    fn generates_requested_length_from_alphabet() {
        for length in [1, 4, 7, 32] {
            let key = generate_key(length).unwrap();
            assert_eq!(key.len(), length);
            assert!(key.bytes().all(|b| ALPHABET.contains(&b)), "{key}");
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        assert_eq!(generate_key(0), Err(Error::InvalidLength { length: 0 }));
        assert!(matches!(
            KeyGenerator::new(0, ThreadRandom),
            Err(Error::InvalidLength { length: 0 })
        ));
    }

    #[test]
    fn draws_one_sample_per_character() {
        let generator = KeyGenerator::new(5, SequenceRand::default()).unwrap();
        assert_eq!(generator.generate(), "abcde");
        assert_eq!(generator.generate(), "fghij");
    }

    #[test]
    fn every_alphabet_symbol_is_reachable() {
        let generator = KeyGenerator::new(ALPHABET.len(), SequenceRand::default()).unwrap();
        let key = generator.generate();
        assert_eq!(key.as_bytes(), ALPHABET.as_slice());
    }

    #[test]
    fn thread_random_keys_rarely_collide() {
        let generator = KeyGenerator::new(16, ThreadRandom).unwrap();
        let keys: HashSet<_> = (0..1000).map(|_| generator.generate()).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn key_space_matches_alphabet_power() {
        assert_eq!(key_space(1), Some(62));
        assert_eq!(key_space(4), Some(14_776_336));
        assert_eq!(key_space(0), Some(1));
        assert_eq!(key_space(20), None);
    }
}
