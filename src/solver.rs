use crate::data::Exam;
use crate::error::ScheduleError;
use crate::index::SlotKey;
use crate::report::Outcome;
use crate::search::{Search, SearchContext};
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, default_solver,
};
use itertools::Itertools;
use log::{info, trace};
use std::collections::BTreeMap;
use std::time::Instant;

/// Solves the placement with the HiGHS ILP solver: maximises the number of
/// scheduled exams, preferring earlier timeslots and smaller rooms among
/// equally large schedules.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerProgram;

impl Search for IntegerProgram {
    fn name(&self) -> &'static str {
        "ilp"
    }

    fn assign(
        &self,
        exams: &[&Exam],
        ctx: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<Outcome>, ScheduleError> {
        ctx.require_static(self.name())?;
        let start_time = Instant::now();

        // pre-filter: only admissible (exam, slot) pairs get a variable
        let mut candidates: Vec<(usize, SlotKey)> = Vec::new();
        for (position, exam) in exams.iter().enumerate() {
            ctx.guard.check(position)?;
            candidates.extend(ctx.candidates(exam).into_iter().map(|key| (position, key)));
        }

        info!(
            "Setting up ILP model with {} exams and {} candidate placements...",
            exams.len(),
            candidates.len()
        );

        let mut matched: Vec<Option<SlotKey>> = vec![None; exams.len()];
        if !candidates.is_empty() {
            let mut problem = ProblemVariables::new();
            let vars: Vec<Variable> = problem.add_vector(variable().binary(), candidates.len());

            // x_es = 1 if exam e occupies slot s
            // every placement is worth 1; the rank penalty sums to < 0.5 overall
            // so it can only break ties between schedules of equal size
            let ranks: BTreeMap<SlotKey, usize> = candidates
                .iter()
                .map(|(_, key)| *key)
                .sorted()
                .dedup()
                .enumerate()
                .map(|(rank, key)| (key, rank))
                .collect();
            let scale = 2.0 * (ranks.len() as f64) * (exams.len() as f64);
            let objective: Expression = candidates
                .iter()
                .zip(&vars)
                .map(|((_, key), var)| (1.0 - ranks[key] as f64 / scale) * *var)
                .sum();

            let mut model = problem
                .maximise(objective)
                .using(default_solver)
                .set_option("threads", 1) // limit to 1 thread for reproducibility
                .set_option("random_seed", 1234)
                .set_option("log_to_console", "false");

            // each exam at most once
            for (_, group) in &candidates.iter().zip(&vars).chunk_by(|((exam, _), _)| *exam) {
                let once: Expression = group.map(|(_, var)| *var).sum();
                model.add_constraint(constraint!(once <= 1));
            }

            // each slot at most once
            let by_slot = candidates
                .iter()
                .zip(&vars)
                .map(|((_, key), var)| (*key, *var))
                .into_group_map();
            for key in ranks.keys() {
                let occupied: Expression = by_slot[key].iter().copied().sum();
                model.add_constraint(constraint!(occupied <= 1));
            }

            info!("Starting ILP solver...");
            let solution = model.solve().map_err(|e| ScheduleError::Solver(e.to_string()))?;
            info!("Solution found in {:.2?}", start_time.elapsed());

            for ((exam, key), var) in candidates.iter().zip(&vars) {
                if solution.value(*var) > 0.5 {
                    trace!("Exam {} -> {}", exams[*exam].id, ctx.index.slot(*key));
                    matched[*exam] = Some(*key);
                }
            }
        }

        for (exam, slot) in exams.iter().zip(&matched) {
            if let Some(key) = slot {
                ctx.place(exam, *key)?;
            }
        }
        let outcomes = exams
            .iter()
            .zip(matched)
            .map(|(exam, slot)| match slot {
                Some(key) => Outcome::Scheduled(key),
                None => Outcome::Unscheduled(ctx.diagnose(exam)),
            })
            .collect();
        Ok(outcomes)
    }
}
