use exam_scheduler::matching::MaximumMatching;
use exam_scheduler::search::{FirstFit, SelectionRule};
use exam_scheduler::{
    schedule, Exam, FailureReason, Room, ScheduleError, ScheduleInput, Scheduler,
    SchedulingReport, Slot, Timeslot,
};
use std::collections::{HashMap, HashSet};

fn day(id: &str, date: &str) -> Timeslot {
    Timeslot::new(id, date, "09:00", "12:00")
}

#[test]
fn scenario_a_exact_fit_is_scheduled() {
    let report = schedule(
        &[Exam::new("e1", 30)],
        &[Room::new("r1", 30)],
        &[day("t1", "2025-06-01")],
        &[],
    )
    .unwrap();

    assert_eq!(report.scheduled_count(), 1);
    let assignment = report.assignment_for("e1").unwrap();
    assert_eq!(assignment.room_id, "r1");
    assert_eq!(assignment.timeslot_id, "t1");
    assert!(report.unscheduled.is_empty());
}

#[test]
fn scenario_b_oversized_exam_has_no_room() {
    let report = schedule(
        &[Exam::new("e1", 40)],
        &[Room::new("r1", 30)],
        &[day("t1", "2025-06-01")],
        &[],
    )
    .unwrap();

    assert!(report.assignments.is_empty());
    let failure = report.failure_for("e1").unwrap();
    assert_eq!(failure.reason, FailureReason::NoRoomLargeEnough);
    assert_eq!(failure.detail, "needs 40 seats, largest room holds 30");
}

#[test]
fn scenario_c_second_exam_finds_slot_taken() {
    let report = schedule(
        &[Exam::new("e2", 20), Exam::new("e1", 20)],
        &[Room::new("r1", 20)],
        &[day("t1", "2025-06-01")],
        &[],
    )
    .unwrap();

    // equal sizes fall back to identifier order
    assert_eq!(report.scheduled_count(), 1);
    assert_eq!(report.assignments[0].exam_id, "e1");
    assert_eq!(
        report.failure_for("e2").map(|u| u.reason),
        Some(FailureReason::AllSuitableSlotsTaken)
    );
}

#[test]
fn scenario_d_large_exam_keeps_its_preferred_timeslot() {
    let report = schedule(
        &[Exam::new("small", 20), Exam::new("large", 50)],
        &[Room::new("r1", 50)],
        &[day("t2", "2025-06-02"), day("t1", "2025-06-01")],
        &[],
    )
    .unwrap();

    assert_eq!(report.scheduled_count(), 2);
    assert_eq!(report.assignments[0].exam_id, "large");
    assert_eq!(report.assignments[0].timeslot_id, "t1");
    assert_eq!(report.assignments[1].exam_id, "small");
    assert_eq!(report.assignments[1].timeslot_id, "t2");
}

#[test]
fn duplicate_room_identifiers_abort_the_run() {
    let result = schedule(
        &[Exam::new("e1", 10)],
        &[Room::new("r1", 30), Room::new("r1", 40)],
        &[day("t1", "2025-06-01")],
        &[],
    );
    assert_eq!(
        result,
        Err(ScheduleError::DuplicateIdentifier {
            kind: "room",
            id: "r1".into()
        })
    );
}

#[test]
fn duplicate_timeslots_and_exams_abort_the_run() {
    let timeslots = [day("t1", "2025-06-01"), day("t1", "2025-06-02")];
    assert!(matches!(
        schedule(&[Exam::new("e1", 10)], &[Room::new("r1", 30)], &timeslots, &[]),
        Err(ScheduleError::DuplicateIdentifier { kind: "timeslot", .. })
    ));

    let exams = [Exam::new("e1", 10), Exam::new("e1", 12)];
    assert!(matches!(
        schedule(&exams, &[Room::new("r1", 30)], &[day("t1", "2025-06-01")], &[]),
        Err(ScheduleError::DuplicateIdentifier { kind: "exam", .. })
    ));
}

#[test]
fn empty_identifier_is_invalid_input() {
    let result = schedule(
        &[Exam::new(" ", 10)],
        &[Room::new("r1", 30)],
        &[day("t1", "2025-06-01")],
        &[],
    );
    assert!(matches!(result, Err(ScheduleError::InvalidInput { .. })));
}

#[test]
fn no_timeslots_means_no_eligible_timeslot() {
    let report = schedule(&[Exam::new("e1", 10)], &[Room::new("r1", 30)], &[], &[]).unwrap();
    assert_eq!(
        report.failure_for("e1").map(|u| u.reason),
        Some(FailureReason::NoEligibleTimeslot)
    );
}

#[test]
fn incremental_run_respects_committed_slots() {
    let report = schedule(
        &[Exam::new("e1", 10)],
        &[Room::new("r1", 30), Room::new("r2", 30)],
        &[day("t1", "2025-06-01")],
        &[Slot::new("r1", "t1")],
    )
    .unwrap();
    assert_eq!(report.assignments[0].room_id, "r2");
}

// ---------------------------------------------------------------------------
// Property checks over generated instances
// ---------------------------------------------------------------------------

struct Lcg(u64);

impl Lcg {
    fn below(&mut self, bound: u32) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) % u64::from(bound)) as u32
    }
}

fn generate(seed: u64) -> ScheduleInput {
    let mut rng = Lcg(seed);
    let timeslots: Vec<Timeslot> = (0..1 + rng.below(4))
        .map(|i| day(&format!("t{i}"), &format!("2025-06-{:02}", i + 1)))
        .collect();
    let rooms: Vec<Room> = (0..1 + rng.below(4))
        .map(|i| Room::new(format!("r{i}"), 10 + rng.below(51)))
        .collect();
    let exams: Vec<Exam> = (0..1 + rng.below(12))
        .map(|i| {
            let exam = Exam::new(format!("e{i:02}"), 1 + rng.below(60));
            if rng.below(4) == 0 {
                let pick = rng.below(timeslots.len() as u32);
                exam.restricted_to([format!("t{pick}")])
            } else {
                exam
            }
        })
        .collect();
    ScheduleInput {
        exams,
        rooms,
        timeslots,
        already_consumed: Vec::new(),
    }
}

fn schedulers() -> Vec<Scheduler> {
    vec![
        Scheduler::default(),
        Scheduler::new().with_search(FirstFit::new(SelectionRule::RoomMajor)),
        Scheduler::new().with_search(MaximumMatching),
    ]
}

fn assert_valid(input: &ScheduleInput, report: &SchedulingReport) {
    let mut seen = HashSet::new();
    for id in report
        .assignments
        .iter()
        .map(|a| &a.exam_id)
        .chain(report.unscheduled.iter().map(|u| &u.exam_id))
    {
        assert!(seen.insert(id.clone()), "exam {id} reported twice");
    }
    assert_eq!(seen.len(), input.exams.len());
    assert!(input.exams.iter().all(|e| seen.contains(&e.id)));

    let exams: HashMap<&str, &Exam> = input.exams.iter().map(|e| (e.id.as_str(), e)).collect();
    let rooms: HashMap<&str, &Room> = input.rooms.iter().map(|r| (r.id.as_str(), r)).collect();
    let mut slots: HashSet<Slot> = input.already_consumed.iter().cloned().collect();
    for assignment in &report.assignments {
        let exam = exams[assignment.exam_id.as_str()];
        let room = rooms[assignment.room_id.as_str()];
        assert!(room.capacity >= exam.students_count, "{assignment:?} over capacity");
        assert!(slots.insert(assignment.slot()), "{assignment:?} double-booked");
        if let Some(allowed) = &exam.eligible_timeslots {
            assert!(allowed.contains(&assignment.timeslot_id));
        }
    }
}

#[test]
fn generated_reports_are_complete_safe_and_exclusive() {
    for seed in 0..200 {
        let input = generate(seed);
        for scheduler in schedulers() {
            let report = scheduler.run(&input).unwrap();
            assert_valid(&input, &report);
        }
    }
}

#[test]
fn incremental_generated_reports_never_reuse_committed_slots() {
    for seed in 0..100 {
        let mut input = generate(seed);
        input.already_consumed = vec![Slot::new("r0", "t0")];
        let report = Scheduler::default().run(&input).unwrap();
        assert_valid(&input, &report);
    }
}

#[test]
fn identical_inputs_give_byte_identical_reports() {
    for seed in 0..50 {
        let input = generate(seed);
        for scheduler in schedulers() {
            let first = serde_json::to_string(&scheduler.run(&input).unwrap()).unwrap();
            let second = serde_json::to_string(&scheduler.run(&input).unwrap()).unwrap();
            assert_eq!(first, second);
        }
    }
}

#[test]
fn input_permutation_does_not_change_the_default_schedule() {
    for seed in 0..50 {
        let input = generate(seed);
        let mut shuffled = input.clone();
        shuffled.exams.reverse();
        shuffled.rooms.reverse();
        shuffled.timeslots.reverse();
        assert_eq!(
            Scheduler::default().run(&input).unwrap().assignments,
            Scheduler::default().run(&shuffled).unwrap().assignments
        );
    }
}

#[test]
fn appending_a_timeslot_never_reduces_first_fit_count() {
    for seed in 0..100 {
        let input = generate(seed);
        let before = Scheduler::default().run(&input).unwrap().scheduled_count();

        let mut more = input.clone();
        more.timeslots.push(day("t9", "2025-07-01"));
        let after = Scheduler::default().run(&more).unwrap().scheduled_count();
        assert!(after >= before, "seed {seed}: {before} -> {after}");
    }
}

#[test]
fn adding_resources_never_reduces_matching_count() {
    let matching = Scheduler::new().with_search(MaximumMatching);
    for seed in 0..100 {
        let input = generate(seed);
        let before = matching.run(&input).unwrap().scheduled_count();

        let mut with_room = input.clone();
        with_room.rooms.push(Room::new("extra-room", 35));
        assert!(matching.run(&with_room).unwrap().scheduled_count() >= before);

        let mut with_timeslot = input.clone();
        with_timeslot.timeslots.insert(0, day("early", "2025-05-01"));
        assert!(matching.run(&with_timeslot).unwrap().scheduled_count() >= before);
    }
}

#[test]
fn matching_is_never_worse_than_first_fit() {
    let matching = Scheduler::new().with_search(MaximumMatching);
    for seed in 0..200 {
        let input = generate(seed);
        let greedy = Scheduler::default().run(&input).unwrap().scheduled_count();
        let best = matching.run(&input).unwrap().scheduled_count();
        assert!(best >= greedy, "seed {seed}: matching {best} < first-fit {greedy}");
    }
}
