//! Victim selection.

use rand::Rng;

use crate::error::{KillerError, Result};

/// Pick `count` distinct indices out of `0..len`, uniformly at random.
///
/// Duplicate draws are discarded and redrawn, so each index is equally
/// likely to be chosen in any position.
pub fn select_victims<R: Rng + ?Sized>(len: usize, count: usize, rng: &mut R) -> Result<Vec<usize>> {
    if count > len {
        return Err(KillerError::InvalidConfig(format!(
            "cannot select {} victims from {} live targets",
            count, len
        )));
    }

    let mut chosen = Vec::with_capacity(count);
    while chosen.len() < count {
        let candidate = rng.gen_range(0..len);
        if !chosen.contains(&candidate) {
            chosen.push(candidate);
        }
    }
    Ok(chosen)
}
