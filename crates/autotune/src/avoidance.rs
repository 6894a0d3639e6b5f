//! Short-term memory of visited states (the tabu list).

use flagforge_model::FlagSet;
use std::collections::{HashSet, VecDeque};

/// Bounded set of recently visited flag sets.
///
/// Eviction is least-recently-inserted: re-inserting a member moves it to the
/// back, and an insertion past capacity drops the oldest member. The state
/// inserted last is therefore always tabu while `capacity > 0`.
#[derive(Clone, Debug)]
pub struct AvoidanceSet {
    order: VecDeque<FlagSet>,
    members: HashSet<FlagSet>,
    capacity: usize,
}

impl AvoidanceSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(4096)),
            members: HashSet::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    #[inline]
    pub fn contains(&self, set: &FlagSet) -> bool {
        self.members.contains(set)
    }

    /// Record `set` as most recent, returning the evicted member, if any.
    pub fn insert(&mut self, set: FlagSet) -> Option<FlagSet> {
        if self.capacity == 0 {
            return None;
        }
        if self.members.contains(&set) {
            if let Some(pos) = self.order.iter().position(|s| *s == set) {
                self.order.remove(pos);
            }
            self.order.push_back(set);
            return None;
        }

        let evicted = if self.order.len() >= self.capacity {
            self.order.pop_front().inspect(|old| {
                self.members.remove(old);
            })
        } else {
            None
        };
        self.members.insert(set.clone());
        self.order.push_back(set);
        evicted
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
