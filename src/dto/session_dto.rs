use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::ids::{AnswerId, EmployeeId, QuestionId, TestId};
use crate::models::question::QuestionType;
use crate::session::{Selection, Session, SessionState, SubmitTrigger};
use crate::utils::time::format_clock;
use crate::utils::validation::exactly_one_of;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(range(min = 1, message = "Test id must be positive"))]
    pub test_id: i64,
    #[validate(range(min = 1, message = "Employee id must be positive"))]
    pub employee_id: i64,
}

impl CreateSessionRequest {
    pub fn ids(&self) -> (TestId, EmployeeId) {
        (TestId(self.test_id), EmployeeId(self.employee_id))
    }
}

/// Either picks an option (`answer_id`) or writes a free-text answer (`text`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_answer_request"))]
pub struct AnswerRequest {
    #[validate(range(min = 1, message = "Question id must be positive"))]
    pub question_id: i64,
    pub answer_id: Option<i64>,
    #[validate(length(max = 10000, message = "Answer text is too long"))]
    pub text: Option<String>,
}

fn validate_answer_request(req: &AnswerRequest) -> Result<(), ValidationError> {
    exactly_one_of(
        &[req.answer_id.is_some(), req.text.is_some()],
        "answer_choice",
        "Provide exactly one of answer_id or text",
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub id: AnswerId,
    pub text: String,
    pub selected: bool,
}

/// The active question without its answer key.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub text: String,
    pub question_type: QuestionType,
    pub points: u32,
    pub time_limit_seconds: Option<u32>,
    pub options: Vec<OptionView>,
    pub text_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimersView {
    pub enabled: bool,
    pub running: bool,
    pub session_remaining: Option<u32>,
    pub session_remaining_display: Option<String>,
    pub question_remaining: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub state: SessionState,
    pub test_id: TestId,
    pub test_title: String,
    pub description: Option<String>,
    pub employee_id: EmployeeId,
    pub attempt_number: u32,
    pub passing_score: u32,
    pub question_index: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub current_question: Option<QuestionView>,
    pub timers: TimersView,
    pub elapsed_seconds: u32,
    pub can_submit: bool,
    pub has_pending_result: bool,
    pub submit_trigger: Option<SubmitTrigger>,
    pub submission_attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let test = session.test();
        let answers = session.answers();
        // Questions are only shown while the attempt is being taken.
        let current_question = session
            .current_question()
            .filter(|_| matches!(session.state(), SessionState::InProgress | SessionState::Submitting))
            .map(|q| {
                let options = q
                    .choices()
                    .map(|set| {
                        set.options()
                            .iter()
                            .map(|o| OptionView {
                                id: o.id,
                                text: o.text.clone(),
                                selected: matches!(answers.get(q.id), Some(Selection::Choices(ids)) if ids.contains(&o.id)),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                QuestionView {
                    id: q.id,
                    text: q.text.clone(),
                    question_type: q.question_type(),
                    points: q.points,
                    time_limit_seconds: q.time_limit_seconds,
                    options,
                    text_answer: answers.text(q.id).map(str::to_string),
                }
            });

        let timers = session.timers();
        SessionView {
            id: session.id(),
            state: session.state(),
            test_id: test.id,
            test_title: test.title.clone(),
            description: test.description.clone(),
            employee_id: session.employee_id(),
            attempt_number: session.attempt_number(),
            passing_score: test.passing_score,
            question_index: session.current_index(),
            total_questions: test.questions().len(),
            answered_count: answers.selected_count(),
            current_question,
            timers: TimersView {
                enabled: timers.is_enabled(),
                running: timers.is_running(),
                session_remaining: timers.session_remaining(),
                session_remaining_display: timers.session_remaining().map(format_clock),
                question_remaining: timers.question_remaining(),
            },
            elapsed_seconds: session.elapsed_seconds(),
            can_submit: session.can_submit(),
            has_pending_result: session.held_sheet().is_some(),
            submit_trigger: session.trigger(),
            submission_attempts: session.submission_attempts(),
            last_error: session.last_error().map(str::to_string),
            created_at: session.created_at(),
            finished_at: session.finished_at(),
        }
    }
}
