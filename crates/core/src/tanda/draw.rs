//! Turn order draw.
//!
//! A fresh 32-byte seed drives a deterministic shuffle of the roster. Each
//! resulting turn carries a token binding the seed, its position, the
//! recipient, the draw time and a salt:
//!
//! ```text
//! randomness_token = hex(SHA-256(seed ‖ turn_number ‖ user_id ‖ drawn_at ‖ salt))
//! ```

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256};

const SEED_LEN: usize = 32;
const SALT_LEN: usize = 16;

/// One committed draw.
#[derive(Clone)]
pub struct TurnDraw {
    seed: [u8; SEED_LEN],
    salt: [u8; SALT_LEN],
    drawn_at: DateTime<Utc>,
}

impl TurnDraw {
    /// Draws a fresh seed and salt from the OS-seeded thread RNG.
    #[must_use]
    pub fn new(drawn_at: DateTime<Utc>) -> Self {
        let mut rng = rand::rng();
        let mut seed = [0u8; SEED_LEN];
        let mut salt = [0u8; SALT_LEN];
        rng.fill_bytes(&mut seed);
        rng.fill_bytes(&mut salt);
        Self::from_parts(seed, salt, drawn_at)
    }

    /// Rebuilds a draw from known parts.
    #[must_use]
    pub fn from_parts(
        seed: [u8; SEED_LEN],
        salt: [u8; SALT_LEN],
        drawn_at: DateTime<Utc>,
    ) -> Self {
        Self {
            seed,
            salt,
            drawn_at,
        }
    }

    /// Returns `items` in drawn order. The same seed always yields the same
    /// order for the same input order.
    #[must_use]
    pub fn order<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let mut ordered = items.to_vec();
        let mut rng = StdRng::from_seed(self.seed);
        ordered.shuffle(&mut rng);
        ordered
    }

    /// Token proving `user_id` holds `turn_number` in this draw.
    #[must_use]
    pub fn token(&self, turn_number: u32, user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(turn_number.to_be_bytes());
        hasher.update(user_id.as_bytes());
        hasher.update(self.drawn_at.to_rfc3339().as_bytes());
        hasher.update(self.salt);
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for TurnDraw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnDraw")
            .field("drawn_at", &self.drawn_at)
            .finish_non_exhaustive()
    }
}
