//! Picks a response while steering clear of the one a user saw last.

use rand::Rng;

/// Picks a response at random. When the roll lands on `last_served` and there
/// is anything else to choose, one re-roll moves to another position:
/// `(i + 1 + r) % len` with `r` drawn from `0..len - 1`, which covers every
/// other position with equal weight.
///
/// Returns `None` only for an empty list.
pub fn pick<'a, R: Rng + ?Sized>(
    responses: &'a [String],
    last_served: Option<&str>,
    rng: &mut R,
) -> Option<&'a str> {
    let len = responses.len();
    if len == 0 {
        return None;
    }

    let mut index = rng.gen_range(0..len);
    if len > 1 && last_served == Some(responses[index].as_str()) {
        index = (index + 1 + rng.gen_range(0..len - 1)) % len;
    }

    Some(responses[index].as_str())
}
