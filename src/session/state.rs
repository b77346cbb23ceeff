use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SessionPolicy;
use crate::dto::backend_dto::SubmitResultRequest;
use crate::models::ids::{AnswerId, EmployeeId, QuestionId};
use crate::models::question::Question;
use crate::models::test::Test;
use crate::models::test_result::TestResult;
use crate::services::result_service::ResultReport;
use crate::services::scoring_service::{ScoreSheet, ScoringService};
use crate::session::{SessionError, SessionTimers, TimerEvent, UserAnswerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Submitting,
    Completed,
    Cancelled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::NotStarted => "not started",
            SessionState::InProgress => "in progress",
            SessionState::Submitting => "submitting",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    User,
    SessionTimeout,
    QuestionTimeout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Idle,
    Advanced { index: usize },
    /// The session moved to `Submitting`; the request must be delivered to the backend.
    Submit(SubmitResultRequest),
}

/// Score sheet computed at first submission, kept until the backend accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeldResult {
    sheet: ScoreSheet,
    time_spent: u32,
}

/// One attempt at a test by one employee.
///
/// `NotStarted -> InProgress -> Submitting -> Completed`, with `Submitting -> InProgress`
/// when delivery fails and `NotStarted | InProgress -> Cancelled`.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    test: Arc<Test>,
    employee_id: EmployeeId,
    attempt_number: u32,
    policy: SessionPolicy,
    state: SessionState,
    answers: UserAnswerState,
    current: usize,
    timers: SessionTimers,
    elapsed_seconds: u32,
    held: Option<HeldResult>,
    trigger: Option<SubmitTrigger>,
    report: Option<ResultReport>,
    last_error: Option<String>,
    submission_attempts: u32,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        test: Arc<Test>,
        employee_id: EmployeeId,
        attempt_number: u32,
        policy: SessionPolicy,
    ) -> Self {
        let timers = SessionTimers::new(test.session_seconds());
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            test,
            employee_id,
            attempt_number,
            policy,
            state: SessionState::NotStarted,
            answers: UserAnswerState::new(),
            current: 0,
            timers,
            elapsed_seconds: 0,
            held: None,
            trigger: None,
            report: None,
            last_error: None,
            submission_attempts: 0,
            created_at: now,
            last_activity: now,
            finished_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn answers(&self) -> &UserAnswerState {
        &self.answers
    }

    pub fn timers(&self) -> &SessionTimers {
        &self.timers
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.test.questions().get(self.current)
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn held_sheet(&self) -> Option<&ScoreSheet> {
        self.held.as_ref().map(|h| &h.sheet)
    }

    pub fn trigger(&self) -> Option<SubmitTrigger> {
        self.trigger
    }

    pub fn report(&self) -> Option<&ResultReport> {
        self.report.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn submission_attempts(&self) -> u32 {
        self.submission_attempts
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Last employee action, or the last submission outcome.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Abandoned: not finished, no delivery in flight, and untouched for `idle_timeout`.
    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: chrono::Duration) -> bool {
        !self.is_finished()
            && self.state != SessionState::Submitting
            && self.last_activity + idle_timeout <= now
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Completed | SessionState::Cancelled)
    }

    pub fn can_submit(&self) -> bool {
        self.state == SessionState::InProgress
            && (!self.policy.require_all_answered
                || self.held.is_some()
                || self.answers.selected_count() >= self.test.questions().len())
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::NotStarted, "start")?;
        self.state = SessionState::InProgress;
        self.last_activity = Utc::now();
        self.timers.start(self.question_limit(self.current));
        tracing::info!(session_id = %self.id, test_id = %self.test.id, "Session started");
        Ok(())
    }

    pub fn select(&mut self, question: QuestionId, answer: AnswerId) -> Result<bool, SessionError> {
        self.ensure_answerable()?;
        let q = self
            .test
            .question(question)
            .ok_or(SessionError::UnknownQuestion(question))?;
        let changed = self.answers.select(q, answer)?;
        self.last_activity = Utc::now();
        Ok(changed)
    }

    pub fn set_text(&mut self, question: QuestionId, text: &str) -> Result<bool, SessionError> {
        self.ensure_answerable()?;
        let q = self
            .test
            .question(question)
            .ok_or(SessionError::UnknownQuestion(question))?;
        let changed = self.answers.set_text(q, text)?;
        self.last_activity = Utc::now();
        Ok(changed)
    }

    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.expect_state(SessionState::InProgress, "move to the next question")?;
        if self.current + 1 < self.test.questions().len() {
            self.move_to(self.current + 1);
        }
        Ok(self.current)
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.expect_state(SessionState::InProgress, "move to the previous question")?;
        if self.current > 0 {
            self.move_to(self.current - 1);
        }
        Ok(self.current)
    }

    /// Explicit submission (or retry after a failed delivery).
    pub fn begin_submit(&mut self, trigger: SubmitTrigger) -> Result<SubmitResultRequest, SessionError> {
        self.expect_state(SessionState::InProgress, "submit")?;
        if trigger == SubmitTrigger::User && !self.can_submit() {
            return Err(SessionError::Incomplete {
                answered: self.answers.selected_count(),
                total: self.test.questions().len(),
            });
        }
        Ok(self.enter_submitting(trigger))
    }

    /// One elapsed second. Does nothing outside `InProgress`.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != SessionState::InProgress {
            return TickOutcome::Idle;
        }
        if self.held.is_none() {
            self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        }

        match self.timers.tick() {
            None => TickOutcome::Idle,
            Some(TimerEvent::SessionExpired) => {
                tracing::info!(session_id = %self.id, "Test time limit reached, submitting");
                TickOutcome::Submit(self.enter_submitting(SubmitTrigger::SessionTimeout))
            }
            Some(TimerEvent::QuestionExpired) => {
                if self.current + 1 < self.test.questions().len() {
                    self.move_to(self.current + 1);
                    tracing::debug!(session_id = %self.id, index = self.current, "Question time limit reached, advancing");
                    TickOutcome::Advanced { index: self.current }
                } else {
                    tracing::info!(session_id = %self.id, "Last question time limit reached, submitting");
                    TickOutcome::Submit(self.enter_submitting(SubmitTrigger::QuestionTimeout))
                }
            }
        }
    }

    /// Applies the backend's acceptance of the submitted result.
    pub fn complete(&mut self, persisted: TestResult) -> Result<&ResultReport, SessionError> {
        self.expect_state(SessionState::Submitting, "complete")?;
        let held = self.held.take().ok_or(SessionError::InvalidState {
            action: "complete",
            state: self.state,
        })?;

        let report = ResultReport::build(
            &self.test,
            &held.sheet,
            &persisted,
            self.employee_id,
            self.attempt_number,
            held.time_spent,
        );
        self.state = SessionState::Completed;
        self.answers = UserAnswerState::new();
        self.finished_at = Some(Utc::now());
        self.last_error = None;
        Ok(&*self.report.insert(report))
    }

    /// Delivery failed: back to `InProgress` with the score sheet kept for a retry.
    pub fn fail_submission(&mut self, error: impl Into<String>) -> Result<(), SessionError> {
        self.expect_state(SessionState::Submitting, "record a failed submission")?;
        self.state = SessionState::InProgress;
        self.last_activity = Utc::now();
        self.last_error = Some(error.into());
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::NotStarted | SessionState::InProgress) {
            return Err(SessionError::InvalidState {
                action: "cancel",
                state: self.state,
            });
        }
        self.timers.stop();
        self.state = SessionState::Cancelled;
        self.held = None;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    fn enter_submitting(&mut self, trigger: SubmitTrigger) -> SubmitResultRequest {
        self.timers.stop();
        let test = Arc::clone(&self.test);
        let answers = &self.answers;
        let elapsed = self.elapsed_seconds;
        let held = self.held.get_or_insert_with(|| HeldResult {
            sheet: ScoringService::score(&test, answers),
            time_spent: elapsed,
        });

        let request = SubmitResultRequest {
            test_id: test.id,
            employee_id: self.employee_id,
            score: held.sheet.score,
            max_score: held.sheet.max_score,
            attempt_number: self.attempt_number,
            time_spent: held.time_spent,
            test_title: Some(test.title.clone()),
            user_answers: held.sheet.user_answers(),
        };

        self.trigger = Some(trigger);
        self.state = SessionState::Submitting;
        self.last_activity = Utc::now();
        self.submission_attempts += 1;
        self.last_error = None;
        request
    }

    fn move_to(&mut self, index: usize) {
        self.current = index;
        self.last_activity = Utc::now();
        self.timers.reset_question(self.question_limit(index));
    }

    fn question_limit(&self, index: usize) -> u32 {
        self.test
            .questions()
            .get(index)
            .and_then(|q| q.time_limit_seconds)
            .unwrap_or(self.policy.default_question_seconds)
    }

    fn ensure_answerable(&self) -> Result<(), SessionError> {
        self.expect_state(SessionState::InProgress, "answer")?;
        if self.held.is_some() {
            return Err(SessionError::AnswersLocked);
        }
        Ok(())
    }

    fn expect_state(&self, expected: SessionState, action: &'static str) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidState {
                action,
                state: self.state,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer::Answer;
    use crate::models::ids::ResultId;
    use crate::models::question::{ChoiceSet, QuestionKind};

    fn single(id: i64) -> Question {
        let set = ChoiceSet::single(
            QuestionId(id),
            vec![
                Answer::new(id * 10 + 1, "right", true),
                Answer::new(id * 10 + 2, "wrong", false),
            ],
        )
        .unwrap();
        Question::new(id, format!("q{}", id), 1, QuestionKind::SingleChoice(set))
    }

    fn two_question_test(time_limit: u32) -> Arc<Test> {
        Arc::new(
            Test::new(1, "Safety", 50, vec![single(1), single(2)])
                .unwrap()
                .with_time_limit(time_limit),
        )
    }

    fn session(test: Arc<Test>) -> Session {
        Session::new(test, EmployeeId(7), 1, SessionPolicy::default())
    }

    fn persisted() -> TestResult {
        serde_json::from_value(serde_json::json!({"id": 99, "passed": true, "percentage": 50})).unwrap()
    }

    #[test]
    fn one_minute_limit_submits_exactly_once_with_zero_score() {
        let test = Arc::new(
            Test::new(1, "t", 50, vec![single(1).with_time_limit(600)])
                .unwrap()
                .with_time_limit(1),
        );
        let mut s = session(test);
        s.start().unwrap();

        let mut submissions = Vec::new();
        for _ in 0..120 {
            if let TickOutcome::Submit(req) = s.tick() {
                submissions.push(req);
            }
        }
        assert_eq!(submissions.len(), 1);
        assert_eq!(s.state(), SessionState::Submitting);
        assert_eq!(s.trigger(), Some(SubmitTrigger::SessionTimeout));
        assert_eq!(submissions[0].score, 0);
        assert_eq!(submissions[0].time_spent, 60);
        assert!(submissions[0].user_answers.is_empty());
    }

    #[test]
    fn question_timer_advances_then_submits_on_last_question() {
        let mut s = session(two_question_test(10));
        s.start().unwrap();

        let outcomes: Vec<_> = (0..60).map(|_| s.tick()).collect();
        assert_eq!(outcomes[59], TickOutcome::Advanced { index: 1 });
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.timers().question_remaining(), Some(60));

        let mut submitted = 0;
        for _ in 0..60 {
            if let TickOutcome::Submit(_) = s.tick() {
                submitted += 1;
            }
        }
        assert_eq!(submitted, 1);
        assert_eq!(s.trigger(), Some(SubmitTrigger::QuestionTimeout));
    }

    #[test]
    fn no_time_limit_never_auto_submits() {
        let mut s = session(two_question_test(0));
        s.start().unwrap();
        for _ in 0..10_000 {
            assert_eq!(s.tick(), TickOutcome::Idle);
        }
        assert_eq!(s.state(), SessionState::InProgress);
        assert_eq!(s.elapsed_seconds(), 10_000);
    }

    #[test]
    fn navigation_resets_question_timer() {
        let mut s = session(two_question_test(5));
        s.start().unwrap();
        for _ in 0..30 {
            s.tick();
        }
        assert_eq!(s.timers().question_remaining(), Some(30));
        assert_eq!(s.next().unwrap(), 1);
        assert_eq!(s.timers().question_remaining(), Some(60));
        assert_eq!(s.next().unwrap(), 1);
        assert_eq!(s.previous().unwrap(), 0);
        assert_eq!(s.previous().unwrap(), 0);
    }

    #[test]
    fn user_submit_is_gated_on_all_answered() {
        let mut s = session(two_question_test(0));
        s.start().unwrap();
        s.select(QuestionId(1), AnswerId(11)).unwrap();
        assert_eq!(
            s.begin_submit(SubmitTrigger::User),
            Err(SessionError::Incomplete { answered: 1, total: 2 })
        );

        let relaxed = SessionPolicy { require_all_answered: false, ..SessionPolicy::default() };
        let mut s = Session::new(two_question_test(0), EmployeeId(7), 1, relaxed);
        s.start().unwrap();
        assert!(s.begin_submit(SubmitTrigger::User).is_ok());
    }

    #[test]
    fn failed_delivery_keeps_sheet_and_locks_answers() {
        let mut s = session(two_question_test(0));
        s.start().unwrap();
        s.select(QuestionId(1), AnswerId(11)).unwrap();
        s.select(QuestionId(2), AnswerId(22)).unwrap();

        let first = s.begin_submit(SubmitTrigger::User).unwrap();
        assert_eq!(s.begin_submit(SubmitTrigger::User).unwrap_err(), SessionError::InvalidState {
            action: "submit",
            state: SessionState::Submitting,
        });
        s.fail_submission("backend down").unwrap();
        assert_eq!(s.state(), SessionState::InProgress);
        assert_eq!(s.last_error(), Some("backend down"));
        assert_eq!(s.select(QuestionId(2), AnswerId(21)), Err(SessionError::AnswersLocked));

        for _ in 0..5 {
            s.tick();
        }
        let retry = s.begin_submit(SubmitTrigger::User).unwrap();
        assert_eq!(retry, first);
        assert_eq!(s.submission_attempts(), 2);

        let report = s.complete(persisted()).unwrap();
        assert_eq!(report.score, 1);
        assert_eq!(report.max_score, 2);
        assert!(report.passed);
        assert_eq!(s.state(), SessionState::Completed);
        assert_eq!(s.answers().selected_count(), 0);
        assert_eq!(s.report().map(|r| r.result_id), Some(ResultId(99)));
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut s = session(two_question_test(1));
        assert!(s.select(QuestionId(1), AnswerId(11)).is_err());
        s.start().unwrap();
        assert!(s.start().is_err());
        s.cancel().unwrap();
        assert!(s.is_finished());
        assert_eq!(s.tick(), TickOutcome::Idle);
        assert!(s.begin_submit(SubmitTrigger::User).is_err());
        assert!(s.cancel().is_err());
        assert!(s.complete(persisted()).is_err());
    }

    #[test]
    fn idle_only_counts_unfinished_sessions_without_delivery_in_flight() {
        let idle = chrono::Duration::seconds(600);
        let mut s = session(two_question_test(0));
        assert!(!s.is_idle(Utc::now(), idle));
        let later = s.last_activity() + idle;
        assert!(s.is_idle(later, idle));

        s.start().unwrap();
        s.select(QuestionId(1), AnswerId(11)).unwrap();
        s.select(QuestionId(2), AnswerId(21)).unwrap();
        s.begin_submit(SubmitTrigger::User).unwrap();
        assert!(!s.is_idle(s.last_activity() + idle * 10, idle));

        s.fail_submission("backend down").unwrap();
        assert!(s.is_idle(s.last_activity() + idle, idle));

        s.cancel().unwrap();
        assert!(!s.is_idle(s.last_activity() + idle * 10, idle));
    }

    #[test]
    fn unknown_question_is_reported() {
        let mut s = session(two_question_test(0));
        s.start().unwrap();
        assert_eq!(
            s.select(QuestionId(42), AnswerId(1)),
            Err(SessionError::UnknownQuestion(QuestionId(42)))
        );
    }
}
