//! Maximum-cardinality placement via augmenting paths (Kuhn's algorithm) over
//! the bipartite graph of exams and admissible slots.

use crate::data::Exam;
use crate::error::ScheduleError;
use crate::index::SlotKey;
use crate::report::Outcome;
use crate::search::{Search, SearchContext};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Schedules as many exams as possible under capacity, eligibility and static
/// constraints. Exams are matched in the given order and each first takes the
/// earliest free slot in scan order, so the result stays close to first-fit
/// whenever no re-routing is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximumMatching;

struct Matcher<'g> {
    adjacency: &'g [Vec<SlotKey>],
    owner: HashMap<SlotKey, usize>,
    matched: Vec<Option<SlotKey>>,
}

impl Matcher<'_> {
    fn claim(&mut self, exam: usize, slot: SlotKey) {
        self.owner.insert(slot, exam);
        self.matched[exam] = Some(slot);
    }

    fn insert(&mut self, exam: usize) -> bool {
        let adjacency = self.adjacency;
        if let Some(&slot) = adjacency[exam]
            .iter()
            .find(|slot| !self.owner.contains_key(*slot))
        {
            self.claim(exam, slot);
            return true;
        }
        self.augment(exam)
    }

    /// Depth-first search for an augmenting path from `root`, kept on an
    /// explicit stack so long paths cannot exhaust the thread stack.
    fn augment(&mut self, root: usize) -> bool {
        let adjacency = self.adjacency;
        let mut visited: HashSet<SlotKey> = HashSet::new();
        // path[i] = (exam, next edge to try); via[i] = slot path[i] wants,
        // currently held by path[i + 1]
        let mut path: Vec<(usize, usize)> = vec![(root, 0)];
        let mut via: Vec<SlotKey> = Vec::new();

        while let Some(frame) = path.last_mut() {
            let (exam, edge) = *frame;
            let Some(&slot) = adjacency[exam].get(edge) else {
                path.pop();
                via.pop();
                continue;
            };
            frame.1 += 1;
            if !visited.insert(slot) {
                continue;
            }
            via.push(slot);
            match self.owner.get(&slot).copied() {
                Some(holder) => path.push((holder, 0)),
                None => {
                    for (&(exam, _), &slot) in path.iter().zip(&via) {
                        self.claim(exam, slot);
                    }
                    return true;
                }
            }
        }
        false
    }
}

impl Search for MaximumMatching {
    fn name(&self) -> &'static str {
        "matching"
    }

    fn assign(
        &self,
        exams: &[&Exam],
        ctx: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<Outcome>, ScheduleError> {
        ctx.require_static(self.name())?;

        let adjacency: Vec<Vec<SlotKey>> = exams.iter().map(|exam| ctx.candidates(exam)).collect();
        let mut matcher = Matcher {
            adjacency: &adjacency,
            owner: HashMap::new(),
            matched: vec![None; exams.len()],
        };
        for position in 0..exams.len() {
            ctx.guard.check(position)?;
            matcher.insert(position);
        }
        debug!(
            "Matched {} of {} exams",
            matcher.owner.len(),
            exams.len()
        );

        for (exam, slot) in exams.iter().zip(&matcher.matched) {
            if let Some(key) = slot {
                ctx.place(exam, *key)?;
            }
        }
        // diagnose against the final occupancy
        let outcomes = exams
            .iter()
            .zip(matcher.matched)
            .map(|(exam, slot)| match slot {
                Some(key) => Outcome::Scheduled(key),
                None => Outcome::Unscheduled(ctx.diagnose(exam)),
            })
            .collect();
        Ok(outcomes)
    }
}
