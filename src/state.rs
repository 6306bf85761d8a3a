//! Per-process session state: the last response each user was served.
//!
//! Lives only in memory and starts empty on every restart.

use crate::selector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

pub struct Session<R = StdRng> {
    last_served: HashMap<String, String>,
    rng: R,
}

impl Session {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Session<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { last_served: HashMap::new(), rng }
    }

    /// Picks a response for `user_id` and records it as their last one.
    pub fn serve<'a>(&mut self, user_id: &str, responses: &'a [String]) -> Option<&'a str> {
        let last = self.last_served.get(user_id).map(String::as_str);
        let picked = selector::pick(responses, last, &mut self.rng)?;
        self.last_served.insert(user_id.to_string(), picked.to_string());
        Some(picked)
    }

    #[cfg(test)]
    pub fn last_served(&self, user_id: &str) -> Option<&str> {
        self.last_served.get(user_id).map(String::as_str)
    }
}
