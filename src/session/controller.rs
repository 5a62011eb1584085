use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::schemas::attempt::{
    AttemptStatus, ExamAttempt, StudentInfo, SubmissionBundle, Violation, ViolationKind,
};
use crate::schemas::exam::{AnswerValue, ExamData, Question, QuestionKind};
use crate::services::availability::{self, Availability, AvailabilityStatus};
use crate::services::scoring;
use crate::session::proctor::{IntegrityMonitor, ProctorConfig, ProctorSignal};
use crate::session::timer::{SessionTimer, TimerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionPhase {
    AwaitingIdentity,
    AwaitingStart,
    InProgress,
    Completed,
    Abandoned,
}

/// Events produced by one controller tick or action, for the host to relay.
#[derive(Debug, Clone)]
pub(crate) enum SessionEvent {
    AvailabilityChanged(Availability),
    TimeWarning { remaining_seconds: u64 },
    AutoSaveDue { answered_questions: usize },
    TimeExpired,
    Completed(Box<SubmissionBundle>),
}

/// Orchestrates one exam session: owns the live attempt and drives the
/// timer, monitor, and availability poll from a single per-second tick.
pub(crate) struct SessionController {
    exam: ExamData,
    questions: Vec<Question>,
    phase: SessionPhase,
    student: Option<StudentInfo>,
    attempt: Option<ExamAttempt>,
    timer: SessionTimer,
    monitor: IntegrityMonitor,
    availability: Availability,
    current_index: usize,
    poll_seconds: u64,
    ticks_since_poll: u64,
    shuffle_seed: u64,
    rng: StdRng,
}

impl SessionController {
    pub(crate) fn new(
        exam: ExamData,
        shuffle_seed: Option<u64>,
        poll_seconds: u64,
        now: OffsetDateTime,
    ) -> Self {
        let seed = shuffle_seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);
        let questions = build_session_questions(&exam, &mut rng);

        let warning_thresholds: Vec<u64> = if exam.config.show_time_warnings {
            exam.config.time_warning_intervals.iter().map(|&m| u64::from(m) * 60).collect()
        } else {
            Vec::new()
        };
        let auto_save = exam
            .config
            .enable_auto_save
            .then_some(u64::from(exam.config.auto_save_interval));

        let timer = SessionTimer::new(
            u64::from(exam.config.time_limit) * 60,
            &warning_thresholds,
            auto_save,
        );
        let monitor = IntegrityMonitor::new(ProctorConfig::from_exam(&exam.config));
        let availability = availability::evaluate(now, exam.config.schedule.as_ref());

        Self {
            exam,
            questions,
            phase: SessionPhase::AwaitingIdentity,
            student: None,
            attempt: None,
            timer,
            monitor,
            availability,
            current_index: 0,
            poll_seconds: poll_seconds.max(1),
            ticks_since_poll: 0,
            shuffle_seed: seed,
            rng,
        }
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn attempt(&self) -> Option<&ExamAttempt> {
        self.attempt.as_ref()
    }

    pub(crate) fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub(crate) fn current_index(&self) -> usize {
        self.current_index
    }

    pub(crate) fn remaining_seconds(&self) -> u64 {
        self.timer.remaining_seconds()
    }

    /// Countdown display in the student-facing format.
    pub(crate) fn format_remaining(&self) -> String {
        self.timer.format_remaining()
    }

    pub(crate) fn shuffle_seed(&self) -> u64 {
        self.shuffle_seed
    }

    pub(crate) fn exam_title(&self) -> &str {
        &self.exam.config.title
    }

    pub(crate) fn provide_identity(&mut self, student: StudentInfo) -> bool {
        if self.phase != SessionPhase::AwaitingIdentity {
            return false;
        }
        self.student = Some(student);
        self.phase = SessionPhase::AwaitingStart;
        true
    }

    pub(crate) fn refresh_availability(&mut self, now: OffsetDateTime) -> &Availability {
        self.availability = availability::evaluate(now, self.exam.config.schedule.as_ref());
        &self.availability
    }

    /// Begins the attempt. Refused (no state change) unless identity is
    /// provided and the schedule currently permits starting.
    pub(crate) fn start(&mut self, now: OffsetDateTime) -> bool {
        if self.phase != SessionPhase::AwaitingStart {
            return false;
        }

        self.refresh_availability(now);
        if !self.availability.can_start {
            tracing::warn!(
                status = ?self.availability.status,
                "Refused session start outside the allowed window"
            );
            return false;
        }

        let student_id = self
            .student
            .as_ref()
            .map(|student| student.id.clone())
            .unwrap_or_else(|| "unknown".to_string());

        // Drawn from the session rng so a seeded replay reproduces the id.
        let attempt_id = Uuid::from_bytes(self.rng.gen());

        self.attempt = Some(ExamAttempt {
            id: format!("attempt-{attempt_id}"),
            exam_id: self.exam.config.title.clone(),
            student_id,
            start_time: now,
            end_time: None,
            answers: BTreeMap::new(),
            score: None,
            status: AttemptStatus::InProgress,
            tab_switch_count: 0,
            violations: Vec::new(),
            is_late_submission: false,
            penalty_applied: 0,
        });
        self.phase = SessionPhase::InProgress;
        self.ticks_since_poll = 0;
        self.timer.start();

        metrics::counter!("exam_sessions_total", "outcome" => "started").increment(1);
        tracing::info!(
            exam = %self.exam.config.title,
            questions = self.questions.len(),
            seed = self.shuffle_seed,
            "Exam session started"
        );
        true
    }

    /// Overwrites the answer for a question in the session set. Refused
    /// outside an in-progress session or for unknown question ids.
    pub(crate) fn record_answer(&mut self, question_id: &str, value: AnswerValue) -> bool {
        if self.phase != SessionPhase::InProgress {
            return false;
        }
        if !self.questions.iter().any(|question| question.id == question_id) {
            return false;
        }

        let Some(attempt) = self.attempt.as_mut() else {
            return false;
        };
        attempt.answers.insert(question_id.to_string(), value);
        true
    }

    /// Moves the active question pointer. Backward moves are refused when
    /// back navigation is disabled.
    pub(crate) fn go_to(&mut self, index: usize) -> bool {
        if self.phase != SessionPhase::InProgress || index >= self.questions.len() {
            return false;
        }
        if index < self.current_index && !self.exam.config.allow_back_navigation {
            return false;
        }
        self.current_index = index;
        true
    }

    /// Feeds one proctor signal through the monitor, recording any
    /// violation on the attempt. Log append happens before the tab-switch
    /// counter is derived from it.
    pub(crate) fn observe_signal(
        &mut self,
        signal: &ProctorSignal,
        now: OffsetDateTime,
    ) -> Option<Violation> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        let violation = self.monitor.observe(signal, now)?;
        self.record_violation(violation.clone());
        Some(violation)
    }

    /// Records the environment's answer to a fullscreen request made from a
    /// user gesture. Denial is non-fatal.
    pub(crate) fn request_fullscreen(
        &mut self,
        granted: bool,
        now: OffsetDateTime,
    ) -> Option<Violation> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        let violation = self.monitor.request_fullscreen(granted, now)?;
        self.record_violation(violation.clone());
        Some(violation)
    }

    pub(crate) fn is_fullscreen(&self) -> bool {
        self.monitor.is_fullscreen()
    }

    /// Advances the session by one second: drives the countdown and, on the
    /// configured cadence, the availability poll. Returns the events that
    /// fired this tick.
    pub(crate) fn tick(&mut self, now: OffsetDateTime) -> Vec<SessionEvent> {
        if self.phase != SessionPhase::InProgress {
            return Vec::new();
        }

        let mut events = Vec::new();

        self.ticks_since_poll += 1;
        if self.ticks_since_poll >= self.poll_seconds {
            self.ticks_since_poll = 0;
            let previous = self.availability.status;
            self.refresh_availability(now);
            if self.availability.status != previous {
                events.push(SessionEvent::AvailabilityChanged(self.availability.clone()));
            }
        }

        for timer_event in self.timer.tick() {
            match timer_event {
                TimerEvent::Warning(remaining_seconds) => {
                    events.push(SessionEvent::TimeWarning { remaining_seconds });
                }
                TimerEvent::AutoSave => {
                    let answered = self
                        .attempt
                        .as_ref()
                        .map(|attempt| attempt.answers.len())
                        .unwrap_or_default();
                    metrics::counter!("exam_auto_saves_total").increment(1);
                    events.push(SessionEvent::AutoSaveDue { answered_questions: answered });
                }
                TimerEvent::Expired => {
                    if self.exam.config.auto_submit_on_time_expiry {
                        tracing::info!("Time expired, auto-submitting attempt");
                        if let Some(bundle) = self.complete(now) {
                            events.push(SessionEvent::Completed(Box::new(bundle)));
                        }
                    } else {
                        tracing::warn!("Time expired, waiting for manual submission");
                        events.push(SessionEvent::TimeExpired);
                    }
                }
            }
        }

        events
    }

    /// Manual submission. A session already in progress may always submit;
    /// the schedule only decides whether the late penalty applies.
    pub(crate) fn submit(&mut self, now: OffsetDateTime) -> Option<SubmissionBundle> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        self.complete(now)
    }

    /// Terminal close without submission: the attempt keeps its answers and
    /// violations but receives no score.
    pub(crate) fn abandon(&mut self, now: OffsetDateTime) -> bool {
        if self.phase != SessionPhase::InProgress {
            return false;
        }

        if let Some(attempt) = self.attempt.as_mut() {
            attempt.status = AttemptStatus::Abandoned;
            attempt.end_time = Some(now);
        }
        self.timer.pause();
        self.phase = SessionPhase::Abandoned;

        metrics::counter!("exam_sessions_total", "outcome" => "abandoned").increment(1);
        tracing::info!(exam = %self.exam.config.title, "Exam session abandoned");
        true
    }

    fn record_violation(&mut self, violation: Violation) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };

        let is_tab_switch = violation.kind == ViolationKind::TabSwitch;
        metrics::counter!("exam_violations_total").increment(1);
        tracing::warn!(kind = ?violation.kind, message = %violation.message, "Integrity violation");

        attempt.violations.push(violation);
        if is_tab_switch {
            attempt.tab_switch_count += 1;
        }
    }

    /// The single completion path shared by manual submit and auto-submit on
    /// expiry. Late-submission status is evaluated at completion time; the
    /// penalty subtracts from the raw percentage, floored at zero.
    fn complete(&mut self, now: OffsetDateTime) -> Option<SubmissionBundle> {
        self.refresh_availability(now);

        let student = self.student.clone()?;
        let attempt = self.attempt.as_mut()?;

        let outcome = scoring::score(&self.questions, &attempt.answers);
        let mut final_score = outcome.percentage;

        if self.availability.status == AvailabilityStatus::LateSubmission {
            let penalty = self.availability.penalty_percentage.unwrap_or_default();
            attempt.is_late_submission = true;
            attempt.penalty_applied = penalty;
            final_score = final_score.saturating_sub(penalty);
        }

        attempt.score = Some(final_score);
        attempt.end_time = Some(now);
        attempt.status = AttemptStatus::Completed;
        self.timer.pause();
        self.phase = SessionPhase::Completed;

        metrics::counter!("exam_sessions_total", "outcome" => "completed").increment(1);
        tracing::info!(
            exam = %self.exam.config.title,
            score = final_score,
            late = attempt.is_late_submission,
            violations = attempt.violations.len(),
            "Exam session completed"
        );

        Some(SubmissionBundle {
            student_info: student,
            exam_title: self.exam.config.title.clone(),
            exam_id: self.exam.config.title.clone(),
            attempt: attempt.clone(),
            questions: self.questions.clone(),
            submission_time: now,
        })
    }
}

/// The question set shown during the session: definition order, optionally
/// shuffled, option lists optionally shuffled per question, truncated to the
/// configured count. Established once, before the first question is shown.
fn build_session_questions(exam: &ExamData, rng: &mut StdRng) -> Vec<Question> {
    let mut questions = exam.questions.clone();

    if exam.config.randomize_questions {
        questions.shuffle(rng);
    }

    if exam.config.randomize_options {
        for question in &mut questions {
            if matches!(question.kind, QuestionKind::MultipleChoice | QuestionKind::Matching) {
                if let Some(options) = question.options.as_mut() {
                    options.shuffle(rng);
                }
            }
        }
    }

    questions.truncate(exam.config.total_questions);
    questions
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::Duration;

    use super::*;
    use crate::schemas::exam::{ExamConfig, ExamSchedule};

    fn question(id: &str, kind: QuestionKind, correct: Option<AnswerValue>, points: u32) -> Question {
        Question {
            id: id.to_string(),
            kind,
            question: format!("prompt for {id}"),
            options: Some(vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()]),
            correct_answer: correct,
            points,
            time_limit: None,
            allow_calculator: None,
            explanation: None,
            difficulty: None,
            category: None,
            image: None,
        }
    }

    fn text(value: &str) -> AnswerValue {
        AnswerValue::Text(value.to_string())
    }

    fn config() -> ExamConfig {
        ExamConfig {
            title: "Algebra".to_string(),
            description: String::new(),
            time_limit: 1,
            total_questions: 2,
            passing_score: 50,
            allow_calculator: false,
            allow_back_navigation: true,
            randomize_questions: false,
            randomize_options: false,
            show_results_immediately: false,
            max_attempts: 1,
            enable_tab_switch_detection: true,
            enable_full_screen_mode: false,
            enable_copy_paste_protection: false,
            enable_right_click_protection: false,
            auto_submit_on_time_expiry: true,
            show_time_warnings: true,
            time_warning_intervals: vec![5, 1],
            enable_auto_save: false,
            auto_save_interval: 30,
            schedule: None,
        }
    }

    fn exam() -> ExamData {
        ExamData {
            config: config(),
            questions: vec![
                question("q1", QuestionKind::MultipleChoice, Some(text("B")), 1),
                question("q2", QuestionKind::TrueFalse, Some(text("true")), 1),
            ],
        }
    }

    fn schedule(start: OffsetDateTime, end: OffsetDateTime) -> ExamSchedule {
        ExamSchedule {
            id: "sched-1".to_string(),
            start_date: start,
            end_date: end,
            timezone: "UTC".to_string(),
            allow_early_start: false,
            allow_late_submission: true,
            late_submission_penalty: 10,
            max_late_minutes: 30,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn student() -> StudentInfo {
        StudentInfo { name: "Ada Lovelace".to_string(), id: "s-42".to_string(), email: None }
    }

    fn now() -> OffsetDateTime {
        datetime!(2025-03-01 09:00 UTC)
    }

    fn started_controller(exam: ExamData) -> SessionController {
        let mut controller = SessionController::new(exam, Some(7), 30, now());
        assert!(controller.provide_identity(student()));
        assert!(controller.start(now()));
        controller
    }

    #[test]
    fn start_requires_identity_first() {
        let mut controller = SessionController::new(exam(), Some(7), 30, now());
        assert_eq!(controller.phase(), SessionPhase::AwaitingIdentity);
        assert!(!controller.start(now()));

        assert!(controller.provide_identity(student()));
        assert!(controller.start(now()));
        assert_eq!(controller.phase(), SessionPhase::InProgress);

        let attempt = controller.attempt().unwrap();
        assert_eq!(attempt.status, AttemptStatus::InProgress);
        assert_eq!(attempt.student_id, "s-42");
        assert!(attempt.answers.is_empty());
        assert!(attempt.violations.is_empty());
    }

    #[test]
    fn start_is_gated_by_the_schedule() {
        let mut exam = exam();
        exam.config.schedule =
            Some(schedule(now() + Duration::hours(1), now() + Duration::hours(3)));

        let mut controller = SessionController::new(exam, Some(7), 30, now());
        controller.provide_identity(student());
        assert!(!controller.start(now()));
        assert_eq!(controller.phase(), SessionPhase::AwaitingStart);
        assert!(controller.attempt().is_none());
    }

    #[test]
    fn early_start_flag_permits_starting_before_the_window() {
        let mut exam = exam();
        let mut sched = schedule(now() + Duration::hours(1), now() + Duration::hours(3));
        sched.allow_early_start = true;
        exam.config.schedule = Some(sched);

        let mut controller = SessionController::new(exam, Some(7), 30, now());
        controller.provide_identity(student());
        assert!(controller.start(now()));
    }

    #[test]
    fn record_answer_overwrites_and_rejects_unknown_ids() {
        let mut controller = started_controller(exam());

        assert!(controller.record_answer("q1", text("A")));
        assert!(controller.record_answer("q1", text("B")));
        assert!(!controller.record_answer("zz", text("B")));

        let attempt = controller.attempt().unwrap();
        assert_eq!(attempt.answers.get("q1"), Some(&text("B")));
        assert_eq!(attempt.answers.len(), 1);
    }

    #[test]
    fn back_navigation_respects_the_config() {
        let mut controller = started_controller(exam());
        assert!(controller.go_to(1));
        assert!(controller.go_to(0));
        assert!(!controller.go_to(2));

        let mut exam = exam();
        exam.config.allow_back_navigation = false;
        let mut controller = started_controller(exam);
        assert!(controller.go_to(1));
        assert!(!controller.go_to(0));
        assert_eq!(controller.current_index(), 1);
    }

    #[test]
    fn violations_append_before_counters_update() {
        let mut controller = started_controller(exam());

        let violation = controller
            .observe_signal(&ProctorSignal::Visibility { hidden: true }, now())
            .unwrap();
        assert_eq!(violation.kind, ViolationKind::TabSwitch);

        controller.observe_signal(&ProctorSignal::WindowBlur, now());

        let attempt = controller.attempt().unwrap();
        assert_eq!(attempt.violations.len(), 2);
        assert_eq!(attempt.tab_switch_count, 1);
    }

    #[test]
    fn disabled_detector_leaves_the_attempt_untouched() {
        let mut exam = exam();
        exam.config.enable_tab_switch_detection = false;
        let mut controller = started_controller(exam);

        assert!(controller
            .observe_signal(&ProctorSignal::Visibility { hidden: true }, now())
            .is_none());

        let attempt = controller.attempt().unwrap();
        assert!(attempt.violations.is_empty());
        assert_eq!(attempt.tab_switch_count, 0);
    }

    #[test]
    fn fullscreen_denial_is_recorded_not_fatal() {
        let mut exam = exam();
        exam.config.enable_full_screen_mode = true;
        let mut controller = started_controller(exam);

        let violation = controller.request_fullscreen(false, now()).unwrap();
        assert_eq!(violation.kind, ViolationKind::FullscreenDenied);
        assert_eq!(controller.phase(), SessionPhase::InProgress);
        assert_eq!(controller.attempt().unwrap().violations.len(), 1);
    }

    #[test]
    fn submit_scores_and_freezes_the_attempt() {
        let mut controller = started_controller(exam());
        controller.record_answer("q1", text("B"));
        controller.record_answer("q2", text("false"));

        let later = now() + Duration::minutes(10);
        let bundle = controller.submit(later).unwrap();

        assert_eq!(controller.phase(), SessionPhase::Completed);
        assert_eq!(bundle.attempt.status, AttemptStatus::Completed);
        assert_eq!(bundle.attempt.score, Some(50));
        assert_eq!(bundle.attempt.end_time, Some(later));
        assert!(!bundle.attempt.is_late_submission);
        assert_eq!(bundle.exam_title, "Algebra");
        assert_eq!(bundle.questions.len(), 2);
        assert_eq!(bundle.submission_time, later);

        // Frozen: no further mutation is accepted.
        assert!(!controller.record_answer("q1", text("A")));
        assert!(controller.submit(later).is_none());
    }

    #[test]
    fn late_submission_applies_the_penalty() {
        let mut exam = exam();
        exam.config.schedule =
            Some(schedule(now() - Duration::hours(2), now() - Duration::minutes(5)));

        // Start inside the window, submit during the grace period.
        let mut controller = SessionController::new(exam, Some(7), 30, now() - Duration::hours(1));
        controller.provide_identity(student());
        assert!(controller.start(now() - Duration::hours(1)));
        controller.record_answer("q1", text("B"));

        let bundle = controller.submit(now()).unwrap();
        assert!(bundle.attempt.is_late_submission);
        assert_eq!(bundle.attempt.penalty_applied, 10);
        // Raw 50% minus 10 penalty points.
        assert_eq!(bundle.attempt.score, Some(40));
    }

    #[test]
    fn penalty_floors_at_zero() {
        let mut exam = exam();
        let mut sched = schedule(now() - Duration::hours(2), now() - Duration::minutes(5));
        sched.late_submission_penalty = 80;
        exam.config.schedule = Some(sched);

        let mut controller = SessionController::new(exam, Some(7), 30, now() - Duration::hours(1));
        controller.provide_identity(student());
        assert!(controller.start(now() - Duration::hours(1)));
        controller.record_answer("q1", text("B"));

        let bundle = controller.submit(now()).unwrap();
        assert_eq!(bundle.attempt.score, Some(0));
    }

    #[test]
    fn submit_past_the_grace_period_completes_without_penalty() {
        let mut exam = exam();
        exam.config.schedule =
            Some(schedule(now() - Duration::hours(3), now() - Duration::hours(1)));

        let mut controller = SessionController::new(exam, Some(7), 30, now() - Duration::hours(2));
        controller.provide_identity(student());
        assert!(controller.start(now() - Duration::hours(2)));
        controller.record_answer("q1", text("B"));

        // An in-progress session may always finish; only the late window
        // carries a penalty.
        let bundle = controller.submit(now()).unwrap();
        assert!(!bundle.attempt.is_late_submission);
        assert_eq!(bundle.attempt.penalty_applied, 0);
        assert_eq!(bundle.attempt.score, Some(50));
    }

    #[test]
    fn early_started_session_may_submit_before_the_window_opens() {
        let mut exam = exam();
        let mut sched = schedule(now() + Duration::hours(1), now() + Duration::hours(3));
        sched.allow_early_start = true;
        exam.config.schedule = Some(sched);

        let mut controller = SessionController::new(exam, Some(7), 30, now());
        controller.provide_identity(student());
        assert!(controller.start(now()));
        controller.record_answer("q1", text("B"));

        let bundle = controller.submit(now() + Duration::minutes(5)).unwrap();
        assert_eq!(bundle.attempt.score, Some(50));
        assert!(!bundle.attempt.is_late_submission);
    }

    #[test]
    fn expiry_auto_submits_when_configured() {
        let mut controller = started_controller(exam());
        controller.record_answer("q1", text("B"));

        let mut clock = now();
        let mut completed = None;
        for _ in 0..60 {
            clock += Duration::seconds(1);
            for event in controller.tick(clock) {
                if let SessionEvent::Completed(bundle) = event {
                    completed = Some(bundle);
                }
            }
        }

        let bundle = completed.expect("auto-submitted bundle");
        assert_eq!(controller.phase(), SessionPhase::Completed);
        assert_eq!(bundle.attempt.score, Some(50));
        assert_eq!(controller.remaining_seconds(), 0);
    }

    #[test]
    fn expiry_without_auto_submit_only_records() {
        let mut exam = exam();
        exam.config.auto_submit_on_time_expiry = false;
        let mut controller = started_controller(exam);

        let mut clock = now();
        let mut expired = false;
        for _ in 0..60 {
            clock += Duration::seconds(1);
            for event in controller.tick(clock) {
                if matches!(event, SessionEvent::TimeExpired) {
                    expired = true;
                }
            }
        }

        assert!(expired);
        assert_eq!(controller.phase(), SessionPhase::InProgress);
        assert!(controller.submit(clock).is_some());
    }

    #[test]
    fn tick_emits_time_warnings() {
        let mut two_minute_exam = exam();
        two_minute_exam.config.time_limit = 2;
        two_minute_exam.config.time_warning_intervals = vec![1];
        let mut controller = started_controller(two_minute_exam);

        let mut clock = now();
        let mut warned_at = None;
        for _ in 0..70 {
            clock += Duration::seconds(1);
            for event in controller.tick(clock) {
                if let SessionEvent::TimeWarning { remaining_seconds } = event {
                    warned_at = Some(remaining_seconds);
                }
            }
        }
        assert_eq!(warned_at, Some(60));
    }

    #[test]
    fn warnings_are_suppressed_when_the_config_disables_them() {
        let mut quiet_exam = exam();
        quiet_exam.config.time_limit = 2;
        quiet_exam.config.time_warning_intervals = vec![1];
        quiet_exam.config.show_time_warnings = false;
        let mut controller = started_controller(quiet_exam);

        let mut clock = now();
        for _ in 0..70 {
            clock += Duration::seconds(1);
            assert!(!controller
                .tick(clock)
                .iter()
                .any(|event| matches!(event, SessionEvent::TimeWarning { .. })));
        }
    }

    #[test]
    fn auto_save_events_carry_progress() {
        let mut exam = exam();
        exam.config.enable_auto_save = true;
        exam.config.auto_save_interval = 10;
        let mut controller = started_controller(exam);
        controller.record_answer("q1", text("B"));

        let mut clock = now();
        let mut saves = Vec::new();
        for _ in 0..25 {
            clock += Duration::seconds(1);
            for event in controller.tick(clock) {
                if let SessionEvent::AutoSaveDue { answered_questions } = event {
                    saves.push(answered_questions);
                }
            }
        }

        assert_eq!(saves, vec![1, 1]);
    }

    #[test]
    fn availability_poll_runs_on_the_tick_stream() {
        let mut exam = exam();
        exam.config.schedule =
            Some(schedule(now() - Duration::minutes(30), now() + Duration::seconds(10)));

        let mut controller = SessionController::new(exam, Some(7), 5, now());
        controller.provide_identity(student());
        assert!(controller.start(now()));

        let mut clock = now();
        let mut changed_to = None;
        for _ in 0..20 {
            clock += Duration::seconds(1);
            for event in controller.tick(clock) {
                if let SessionEvent::AvailabilityChanged(availability) = event {
                    changed_to = Some(availability.status);
                }
            }
        }

        // The poll crossed the end of the window into late submission.
        assert_eq!(changed_to, Some(AvailabilityStatus::LateSubmission));
    }

    #[test]
    fn abandon_is_terminal_and_unscored() {
        let mut controller = started_controller(exam());
        controller.record_answer("q1", text("B"));

        assert!(controller.abandon(now()));
        assert_eq!(controller.phase(), SessionPhase::Abandoned);

        let attempt = controller.attempt().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Abandoned);
        assert!(attempt.score.is_none());
        assert!(attempt.end_time.is_some());

        assert!(controller.submit(now()).is_none());
        assert!(!controller.abandon(now()));
    }

    #[test]
    fn session_set_truncates_to_the_configured_count() {
        let mut exam = exam();
        exam.questions.push(question("q3", QuestionKind::FillBlank, Some(text("x")), 1));
        exam.config.total_questions = 2;

        let controller = SessionController::new(exam, Some(7), 30, now());
        assert_eq!(controller.questions().len(), 2);
    }

    #[test]
    fn shuffles_are_deterministic_per_seed() {
        let mut exam = exam();
        for index in 3..=12 {
            exam.questions.push(question(
                &format!("q{index}"),
                QuestionKind::MultipleChoice,
                Some(text("B")),
                1,
            ));
        }
        exam.config.total_questions = 12;
        exam.config.randomize_questions = true;
        exam.config.randomize_options = true;

        let first = SessionController::new(exam.clone(), Some(99), 30, now());
        let second = SessionController::new(exam.clone(), Some(99), 30, now());
        let ids = |controller: &SessionController| {
            controller.questions().iter().map(|q| q.id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));

        let definition_order: Vec<String> =
            exam.questions.iter().map(|q| q.id.clone()).collect();
        assert_ne!(ids(&first), definition_order);
    }

    #[test]
    fn option_shuffle_skips_scalar_question_kinds() {
        let mut exam = exam();
        exam.questions = vec![question("q1", QuestionKind::FillBlank, Some(text("x")), 1)];
        exam.config.total_questions = 1;
        exam.config.randomize_options = true;

        let controller = SessionController::new(exam.clone(), Some(99), 30, now());
        assert_eq!(controller.questions()[0].options, exam.questions[0].options);
    }
}
