//! Program lifecycle state engine.
//!
//! [`StateEngine`] owns the [`SessionMemory`] and turns each host
//! lifecycle event into a [`Reaction`]: an optional [`NodeBatch`] to
//! publish now, and whether a delayed "raise running" should be
//! scheduled. The engine never performs I/O and never reads the clock;
//! callers pass the event context and timestamp in, which keeps every
//! decision reproducible in tests.
//!
//! Within the machine-state family every batch asserts one state (or
//! `Stopped` plus one stop reason) and clears all the others.

use crate::context::EventContext;
use crate::mode::OperatingMode;
use crate::node::{LogicalNode, NodeBatch};
use crate::session::SessionMemory;
use crate::types::{Quantity, Timestamp};

use LogicalNode::*;

/// Bend index marking the first step of a program run.
pub const FIRST_BEND: i32 = 0;

/// What the caller must do after an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    /// Nodes to publish now, if any.
    pub batch: Option<NodeBatch>,
    /// Schedule a delayed [`StateEngine::raise_running`].
    pub schedule_resume: bool,
}

impl Reaction {
    fn none() -> Self {
        Self::default()
    }

    fn emit(batch: NodeBatch) -> Self {
        Self {
            batch: Some(batch),
            schedule_resume: false,
        }
    }

    fn resume_after(mut self) -> Self {
        self.schedule_resume = true;
        self
    }
}

/// Decision logic plus the session memory it mutates.
#[derive(Debug, Default)]
pub struct StateEngine {
    memory: SessionMemory,
}

impl StateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the session memory.
    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    /// A program run (or a bend within it) started.
    ///
    /// Ignored outside production modes. A first-bend start that was
    /// not preceded by a finishing completion while a job is active is
    /// taken as a restart after an external abort: `Aborted` is pulsed
    /// together with the program name and target, and `Running` is
    /// deferred to the resume timer.
    pub fn program_started(
        &mut self,
        ctx: &EventContext,
        pgm_name: &str,
        bend_no: i32,
        quantity: Quantity,
        now: Timestamp,
    ) -> Reaction {
        if !ctx.mode.is_production() {
            return Reaction::none();
        }

        if bend_no == FIRST_BEND {
            let was_completed = std::mem::take(&mut self.memory.program_completed);
            self.memory.over_produce = ctx.job.is_some_and(|job| quantity >= job.qty_needed);

            if let Some(job) = ctx.job.filter(|job| !was_completed && job.qty_needed > 0) {
                self.memory.program_name = pgm_name.to_string();
                self.memory.target_quantity = job.qty_needed;
                self.memory.program_completed = false;

                let batch = NodeBatch::new(now)
                    .value(ProgName, pgm_name)
                    .value(TargetQuantity, job.qty_needed.to_string())
                    .flag(Aborted)
                    .clear(&[Running, Stopped, StoppedMalfunction, StoppedOperator, Ended]);
                return Reaction::emit(batch).resume_after();
            }
        }

        Reaction::emit(Self::raise_running(now))
    }

    /// A program run finished with `quantity` parts made so far.
    ///
    /// Schedules an auto-resume while the job still needs parts (or the
    /// count is unknown); otherwise remembers the completion so the next
    /// first-bend start does not pulse `Aborted`.
    pub fn program_completed(
        &mut self,
        ctx: &EventContext,
        _pgm_name: &str,
        quantity: Quantity,
        now: Timestamp,
    ) -> Reaction {
        self.memory.current_quantity = quantity;

        let mut batch = NodeBatch::new(now)
            .flag(Ended)
            .value(CurrentQuantity, quantity.to_string());

        // Only an exact match publishes the target.
        if let Some(job) = ctx.job.filter(|job| job.qty_needed == quantity) {
            self.memory.target_quantity = job.qty_needed;
            batch = batch.value(TargetQuantity, job.qty_needed.to_string());
        }

        let batch = batch.clear(&[
            Running,
            Aborted,
            Stopped,
            StoppedMalfunction,
            StoppedOperator,
            ProgName,
        ]);

        let more_parts = ctx
            .job
            .is_some_and(|job| quantity < job.qty_needed || quantity < 0);

        self.memory.over_produce = false;

        if more_parts {
            Reaction::emit(batch).resume_after()
        } else {
            self.memory.program_completed = true;
            Reaction::emit(batch)
        }
    }

    /// A program run stopped before completion.
    ///
    /// Suppressed when the job is already fulfilled and the run did not
    /// start as an overproduce run.
    pub fn program_stopped(
        &mut self,
        ctx: &EventContext,
        _pgm_name: &str,
        _bend_no: i32,
        quantity: Quantity,
        now: Timestamp,
    ) -> Reaction {
        let fulfilled = ctx.job.is_some_and(|job| quantity >= job.qty_needed);
        if fulfilled && !self.memory.over_produce {
            return Reaction::none();
        }

        let (reason, other) = if ctx.in_error {
            (StoppedMalfunction, StoppedOperator)
        } else {
            (StoppedOperator, StoppedMalfunction)
        };

        let batch = NodeBatch::new(now)
            .flag(Stopped)
            .flag(reason)
            .clear(&[Running, Aborted, Ended, ProgName, other]);
        Reaction::emit(batch)
    }

    /// Bend changes publish nothing.
    pub fn bend_changed(&mut self, _pgm_name: &str, _bend_no: i32) -> Reaction {
        Reaction::none()
    }

    /// Assert `Running` and clear every terminal or abort state.
    pub fn raise_running(now: Timestamp) -> NodeBatch {
        NodeBatch::new(now)
            .flag(Running)
            .clear(&[Aborted, Stopped, StoppedMalfunction, StoppedOperator, Ended])
    }

    /// Record a mode sampled by the poll.
    ///
    /// With `abort_on_exit`, leaving a production mode emits an
    /// `Aborted` batch.
    pub fn mode_observed(
        &mut self,
        mode: OperatingMode,
        abort_on_exit: bool,
        now: Timestamp,
    ) -> Option<NodeBatch> {
        let previous = std::mem::replace(&mut self.memory.last_mode, mode);

        if abort_on_exit && previous.is_production() && !mode.is_production() {
            return Some(
                NodeBatch::new(now)
                    .flag(Aborted)
                    .clear(&[Running, Ended, Stopped, StoppedMalfunction, StoppedOperator]),
            );
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Job;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn ctx(mode: OperatingMode, in_error: bool, qty_needed: Option<Quantity>) -> EventContext {
        EventContext {
            mode,
            in_error,
            job: qty_needed.map(|qty_needed| Job { qty_needed }),
        }
    }

    fn auto_job(qty_needed: Quantity) -> EventContext {
        ctx(OperatingMode::Auto, false, Some(qty_needed))
    }

    fn batch_of(reaction: &Reaction) -> &NodeBatch {
        reaction.batch.as_ref().expect("reaction should carry a batch")
    }

    /// Every state-family member is either set or cleared, never both.
    fn assert_exclusive(batch: &NodeBatch) {
        for node in LogicalNode::STATE_FAMILY {
            let set = batch.asserted(node).is_some();
            let cleared = batch.clears(node);
            assert!(set ^ cleared, "{node:?}: set={set} cleared={cleared}");
        }
    }

    // -----------------------------------------------------------------------
    // ProgramStarted
    // -----------------------------------------------------------------------

    #[test]
    fn fresh_first_bend_start_with_job_pulses_aborted() {
        let mut engine = StateEngine::new();
        let reaction = engine.program_started(&auto_job(10), "PGM1", 0, 5, Utc::now());

        let batch = batch_of(&reaction);
        assert_eq!(batch.set_nodes(), vec![ProgName, TargetQuantity, Aborted]);
        assert_eq!(batch.asserted(ProgName), Some("PGM1"));
        assert_eq!(batch.asserted(TargetQuantity), Some("10"));
        assert_eq!(batch.asserted(Aborted), Some("true"));
        assert_eq!(
            batch.cleared_nodes(),
            vec![Running, Stopped, StoppedMalfunction, StoppedOperator, Ended]
        );
        assert!(batch.asserted(Running).is_none());
        assert!(reaction.schedule_resume);
        assert_exclusive(batch);

        let memory = engine.memory();
        assert_eq!(memory.program_name, "PGM1");
        assert_eq!(memory.target_quantity, 10);
        assert!(!memory.program_completed);
        assert!(!memory.over_produce);
    }

    #[test]
    fn start_outside_production_mode_is_ignored() {
        let mut engine = StateEngine::new();
        for mode in [OperatingMode::Program, OperatingMode::Manual] {
            let reaction = engine.program_started(&ctx(mode, false, Some(10)), "P", 0, 0, Utc::now());
            assert_eq!(reaction, Reaction::default());
        }
        assert_eq!(engine.memory(), &SessionMemory::default());
    }

    #[test]
    fn start_without_job_raises_running_immediately() {
        let mut engine = StateEngine::new();
        let now = Utc::now();
        let reaction =
            engine.program_started(&ctx(OperatingMode::SemiAuto, false, None), "P", 0, -1, now);

        assert_eq!(reaction.batch, Some(StateEngine::raise_running(now)));
        assert!(!reaction.schedule_resume);
    }

    #[test]
    fn start_with_zero_quantity_job_raises_running() {
        let mut engine = StateEngine::new();
        let reaction = engine.program_started(&auto_job(0), "P", 0, 0, Utc::now());
        assert_eq!(batch_of(&reaction).set_nodes(), vec![Running]);
        assert!(!reaction.schedule_resume);
    }

    #[test]
    fn later_bend_start_raises_running_and_keeps_flags() {
        let mut engine = StateEngine::new();
        engine.program_completed(&auto_job(10), "P", 10, Utc::now());
        assert!(engine.memory().program_completed);

        let reaction = engine.program_started(&auto_job(10), "P", 3, 4, Utc::now());
        let batch = batch_of(&reaction);
        assert_eq!(batch.set_nodes(), vec![Running]);
        assert_eq!(
            batch.cleared_nodes(),
            vec![Aborted, Stopped, StoppedMalfunction, StoppedOperator, Ended]
        );
        assert_exclusive(batch);
        assert!(engine.memory().program_completed);
    }

    #[test]
    fn completion_then_restart_skips_abort_pulse() {
        let mut engine = StateEngine::new();
        engine.program_completed(&auto_job(10), "A", 10, Utc::now());
        assert!(engine.memory().program_completed);

        let reaction = engine.program_started(&auto_job(10), "A", 0, 10, Utc::now());
        let batch = batch_of(&reaction);
        assert!(batch.asserted(Aborted).is_none());
        assert_eq!(batch.set_nodes(), vec![Running]);
        assert!(!reaction.schedule_resume);
        assert!(!engine.memory().program_completed);
    }

    #[test]
    fn first_bend_start_computes_over_produce() {
        let mut engine = StateEngine::new();
        engine.program_started(&auto_job(10), "P", 0, 10, Utc::now());
        assert!(engine.memory().over_produce);

        engine.program_started(&auto_job(10), "P", 0, 9, Utc::now());
        assert!(!engine.memory().over_produce);

        engine.program_started(&auto_job(10), "P", 0, 12, Utc::now());
        engine.program_started(&auto_job(10), "P", 4, 0, Utc::now());
        assert!(engine.memory().over_produce, "only bend 0 recomputes");
    }

    // -----------------------------------------------------------------------
    // ProgramCompleted
    // -----------------------------------------------------------------------

    #[test]
    fn completion_reaching_target_publishes_target_and_suppresses() {
        let mut engine = StateEngine::new();
        let reaction = engine.program_completed(&auto_job(10), "PGM1", 10, Utc::now());

        let batch = batch_of(&reaction);
        assert_eq!(batch.set_nodes(), vec![Ended, CurrentQuantity, TargetQuantity]);
        assert_eq!(batch.asserted(Ended), Some("true"));
        assert_eq!(batch.asserted(CurrentQuantity), Some("10"));
        assert_eq!(batch.asserted(TargetQuantity), Some("10"));
        assert_eq!(
            batch.cleared_nodes(),
            vec![Running, Aborted, Stopped, StoppedMalfunction, StoppedOperator, ProgName]
        );
        assert_exclusive(batch);
        assert!(!reaction.schedule_resume);

        let memory = engine.memory();
        assert!(memory.program_completed);
        assert_eq!(memory.current_quantity, 10);
        assert_eq!(memory.target_quantity, 10);
    }

    #[test]
    fn completion_below_target_never_publishes_target() {
        let mut engine = StateEngine::new();
        let reaction = engine.program_completed(&auto_job(10), "PGM1", 9, Utc::now());

        let batch = batch_of(&reaction);
        assert!(batch.asserted(TargetQuantity).is_none());
        assert_eq!(batch.asserted(CurrentQuantity), Some("9"));
        assert!(reaction.schedule_resume, "parts remain, auto-resume");
        assert!(!engine.memory().program_completed);
    }

    #[test]
    fn completion_with_unknown_quantity_resumes() {
        let mut engine = StateEngine::new();
        let reaction = engine.program_completed(&auto_job(-5), "P", -1, Utc::now());
        assert!(reaction.schedule_resume);
        assert_eq!(batch_of(&reaction).asserted(CurrentQuantity), Some("-1"));
    }

    #[test]
    fn completion_without_job_marks_completed() {
        let mut engine = StateEngine::new();
        let reaction =
            engine.program_completed(&ctx(OperatingMode::Program, false, None), "P", 3, Utc::now());
        assert!(!reaction.schedule_resume);
        assert!(batch_of(&reaction).asserted(TargetQuantity).is_none());
        assert!(engine.memory().program_completed);
    }

    #[test]
    fn completion_clears_over_produce() {
        let mut engine = StateEngine::new();
        engine.program_started(&auto_job(10), "P", 0, 11, Utc::now());
        assert!(engine.memory().over_produce);

        engine.program_completed(&auto_job(10), "P", 12, Utc::now());
        assert!(!engine.memory().over_produce);
    }

    // -----------------------------------------------------------------------
    // ProgramStopped
    // -----------------------------------------------------------------------

    #[test]
    fn stop_with_error_and_no_job_reports_malfunction() {
        let mut engine = StateEngine::new();
        let reaction = engine.program_stopped(
            &ctx(OperatingMode::Auto, true, None),
            "PGM1",
            3,
            -1,
            Utc::now(),
        );

        let batch = batch_of(&reaction);
        assert_eq!(batch.set_nodes(), vec![Stopped, StoppedMalfunction]);
        assert_eq!(batch.asserted(Stopped), Some("true"));
        assert_eq!(batch.asserted(StoppedMalfunction), Some("true"));
        for node in [Running, Aborted, Ended, ProgName] {
            assert!(batch.clears(node), "{node:?} should be cleared");
        }
        assert!(batch.clears(StoppedOperator));
        assert_exclusive(batch);
        assert!(!reaction.schedule_resume);
    }

    #[test]
    fn stop_without_error_reports_operator() {
        let mut engine = StateEngine::new();
        let reaction = engine.program_stopped(&auto_job(10), "P", 2, 4, Utc::now());
        let batch = batch_of(&reaction);
        assert_eq!(batch.set_nodes(), vec![Stopped, StoppedOperator]);
        assert!(batch.clears(StoppedMalfunction));
        assert_exclusive(batch);
    }

    #[test]
    fn stop_at_fulfilled_quantity_is_suppressed() {
        let mut engine = StateEngine::new();
        assert!(!engine.memory().over_produce);
        let reaction = engine.program_stopped(&auto_job(10), "P", 0, 10, Utc::now());
        assert_matches!(reaction.batch, None);
    }

    #[test]
    fn stop_in_over_produce_run_is_published() {
        let mut engine = StateEngine::new();
        engine.program_started(&auto_job(10), "P", 0, 10, Utc::now());
        let reaction = engine.program_stopped(&auto_job(10), "P", 5, 11, Utc::now());
        assert_matches!(reaction.batch, Some(_));
    }

    #[test]
    fn repeated_stop_is_idempotent() {
        let mut engine = StateEngine::new();
        let context = ctx(OperatingMode::Auto, true, Some(10));
        let now = Utc::now();

        let first = engine.program_stopped(&context, "P", 1, 4, now);
        let memory_after_first = engine.memory().clone();
        let second = engine.program_stopped(&context, "P", 1, 4, now);

        assert_eq!(first, second);
        assert_eq!(engine.memory(), &memory_after_first);
    }

    // -----------------------------------------------------------------------
    // Misc
    // -----------------------------------------------------------------------

    #[test]
    fn bend_change_emits_nothing() {
        let mut engine = StateEngine::new();
        assert_eq!(engine.bend_changed("P", 4), Reaction::default());
    }

    #[test]
    fn raise_running_is_exclusive() {
        assert_exclusive(&StateEngine::raise_running(Utc::now()));
    }

    #[test]
    fn mode_exit_aborts_only_when_enabled() {
        let mut engine = StateEngine::new();
        let now = Utc::now();

        assert!(engine.mode_observed(OperatingMode::Auto, true, now).is_none());
        let batch = engine
            .mode_observed(OperatingMode::Manual, true, now)
            .expect("leaving auto should abort");
        assert_eq!(batch.set_nodes(), vec![Aborted]);
        assert_exclusive(&batch);
        assert_eq!(engine.memory().last_mode, OperatingMode::Manual);

        engine.mode_observed(OperatingMode::SemiAuto, false, now);
        assert!(engine.mode_observed(OperatingMode::Program, false, now).is_none());
        assert_eq!(engine.memory().last_mode, OperatingMode::Program);
    }
}
