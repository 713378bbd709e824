//! Seeded stream management for deterministic replay.
//!
//! The journal owns the base seed plus the stream cursor of the primary
//! daily stream. Saving the pair and restoring it later resumes the exact
//! draw sequence, which is what makes a saved game replay byte-for-byte.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

/// Persistent handle on the primary deterministic stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngJournal {
    seed: u64,
    /// Stream cursor split into two halves for portable serialization.
    #[serde(default)]
    word_pos: Option<[u64; 2]>,
}

impl Default for RngJournal {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RngJournal {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            word_pos: None,
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Reset to a fresh seed, discarding any saved cursor.
    pub const fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.word_pos = None;
    }

    /// Materialize the primary stream at its saved cursor.
    #[must_use]
    pub fn primary(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        if let Some([hi, lo]) = self.word_pos {
            rng.set_word_pos((u128::from(hi) << 64) | u128::from(lo));
        }
        rng
    }

    /// Record the current cursor of the primary stream for the next save.
    pub fn checkpoint(&mut self, rng: &ChaCha8Rng) {
        let pos = rng.get_word_pos();
        #[allow(clippy::cast_possible_truncation)]
        let halves = [(pos >> 64) as u64, pos as u64];
        self.word_pos = Some(halves);
    }

    /// Derive an isolated stream for an externally injected event.
    ///
    /// The seed mixes the day and the injection coordinates so that the
    /// same injection always rolls the same severity and duration while
    /// never disturbing the primary stream's cursor.
    #[must_use]
    pub fn injection_stream(
        &self,
        day: u32,
        template_id: &str,
        scope: &str,
        target_id: &str,
    ) -> ChaCha8Rng {
        let seed = self.seed
            ^ u64::from(day)
            ^ stable_hash(template_id)
            ^ stable_hash(scope)
            ^ stable_hash(target_id);
        ChaCha8Rng::seed_from_u64(seed)
    }
}

fn stable_hash(value: &str) -> u64 {
    XxHash64::oneshot(0, value.as_bytes())
}
