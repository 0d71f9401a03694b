//! Membership stabilizer: a debounce engine over arbitrary hashable keys.
//!
//! A key must show up in the candidate set across `threshold` consecutive
//! iterations before it is confirmed; one missed iteration drops it back to
//! zero. This suppresses destructive action on a single noisy observation
//! (a peer that missed one keepalive window, a flaky device read).
//!
//! Counts are never capped: once a key crosses the threshold it is confirmed
//! again on every following iteration where it is still a candidate, so
//! confirmation is a level-triggered signal and consumers must make the
//! resulting action idempotent.
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug)]
pub struct IterativeStabilizer<T> {
    data: HashMap<T, u32>,
    threshold: u32,
}

impl<T> IterativeStabilizer<T>
where
    T: Eq + Hash + Clone,
{
    /// Create a stabilizer requiring `threshold` consecutive confirmations.
    /// A threshold of zero would confirm everything instantly, so it is
    /// clamped to one.
    pub fn new(threshold: u32) -> Self {
        Self {
            data: HashMap::new(),
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Number of keys currently being tracked.
    pub fn tracked(&self) -> usize {
        self.data.len()
    }

    /// Match `elements` against previous iterations and return every element
    /// that has now been present in at least `threshold` consecutive runs.
    ///
    /// Elements seen for the first time are seeded at zero; tracked elements
    /// absent from `elements` are dropped entirely and must restart from zero
    /// if they reappear.
    pub fn iterate(&mut self, elements: &HashSet<T>) -> Vec<T> {
        let mut next = HashMap::with_capacity(elements.len());
        let mut matches = Vec::new();

        for element in elements {
            if !self.data.contains_key(element) {
                self.data.insert(element.clone(), 0);
            }
        }
        for (element, count) in &self.data {
            if !elements.contains(element) {
                // present in a previous run but not this one: drop out
                // without carrying the element forward
                continue;
            }
            let count = count + 1;
            if count >= self.threshold {
                matches.push(element.clone());
            }
            next.insert(element.clone(), count);
        }
        self.data = next;
        matches
    }
}
