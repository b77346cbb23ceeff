//! In-memory state of one test-taking attempt.

pub mod answers;
pub mod state;
pub mod timer;

pub use answers::{Selection, UserAnswerState};
pub use state::{Session, SessionState, SubmitTrigger, TickOutcome};
pub use timer::{Countdown, SessionTimers, TimerEvent};

use crate::models::ids::{AnswerId, QuestionId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("question {0} is not part of this test")]
    UnknownQuestion(QuestionId),

    #[error("answer {answer} does not belong to question {question}")]
    UnknownAnswer { question: QuestionId, answer: AnswerId },

    #[error("question {0} takes a free-text answer")]
    NotSelectable(QuestionId),

    #[error("question {0} does not take a free-text answer")]
    NotFreeText(QuestionId),

    #[error("cannot {action} while the session is {state}")]
    InvalidState { action: &'static str, state: SessionState },

    #[error("answers are locked while a computed result awaits submission")]
    AnswersLocked,

    #[error("{answered} of {total} questions answered; all questions must be answered before submitting")]
    Incomplete { answered: usize, total: usize },
}
