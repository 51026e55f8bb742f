use rand::Rng;

use crate::dataset::DbId;
use crate::random::RandomFactory;

/// Identifiers not yet assigned to a partition.
///
/// The first `active` slots hold the remaining candidates; taking one swaps
/// it behind the boundary, so every identifier is handed out exactly once.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    ids: Vec<DbId>,
    active: usize,
}

impl CandidatePool {
    pub fn new(ids: Vec<DbId>) -> Self {
        let active = ids.len();
        Self { ids, active }
    }

    pub fn remaining(&self) -> usize {
        self.active
    }

    pub fn is_exhausted(&self) -> bool {
        self.active == 0
    }

    /// Remove and return a uniformly chosen remaining candidate.
    pub fn take_random(&mut self, rng: &mut impl Rng) -> Option<DbId> {
        if self.active == 0 {
            return None;
        }
        let pick = RandomFactory::next_int(rng, self.active);
        self.take_at(pick)
    }

    /// Remove and return the candidate in slot `slot` of the active range.
    pub fn take_at(&mut self, slot: usize) -> Option<DbId> {
        if slot >= self.active {
            return None;
        }
        self.active -= 1;
        self.ids.swap(slot, self.active);
        Some(self.ids[self.active])
    }

    /// Candidates already taken, most recent first.
    pub fn consumed(&self) -> impl Iterator<Item = DbId> + '_ {
        self.ids[self.active..].iter().copied()
    }
}

impl FromIterator<DbId> for CandidatePool {
    fn from_iter<I: IntoIterator<Item = DbId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
