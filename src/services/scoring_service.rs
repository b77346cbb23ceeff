use serde::Serialize;

use crate::dto::backend_dto::UserAnswerRow;
use crate::models::ids::{AnswerId, QuestionId};
use crate::models::question::{Question, QuestionKind, QuestionType};
use crate::models::test::Test;
use crate::session::UserAnswerState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedOption {
    pub answer_id: AnswerId,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionScore {
    pub question_id: QuestionId,
    pub question_type: QuestionType,
    pub points_earned: u32,
    pub max_points: u32,
    pub is_correct: bool,
    /// Free-text answers wait for a human grader.
    pub needs_review: bool,
    pub selected: Vec<SelectedOption>,
    pub text: Option<String>,
}

/// Scorer output for one attempt. Held by the session until the backend accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSheet {
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub passed: bool,
    pub questions: Vec<QuestionScore>,
}

impl ScoreSheet {
    /// Rows for the backend's `user_answers` list. Unanswered questions produce no row.
    pub fn user_answers(&self) -> Vec<UserAnswerRow> {
        let mut rows = Vec::new();
        for q in &self.questions {
            if let Some(text) = &q.text {
                rows.push(UserAnswerRow {
                    question_id: q.question_id,
                    answer_id: None,
                    answer_text: Some(text.clone()),
                    is_correct: false,
                    points_earned: 0.0,
                });
                continue;
            }
            let share = if q.is_correct && !q.selected.is_empty() {
                f64::from(q.points_earned) / q.selected.len() as f64
            } else {
                0.0
            };
            for option in &q.selected {
                rows.push(UserAnswerRow {
                    question_id: q.question_id,
                    answer_id: Some(option.answer_id),
                    answer_text: None,
                    is_correct: option.is_correct,
                    points_earned: share,
                });
            }
        }
        rows
    }

    pub fn needs_review(&self) -> bool {
        self.questions.iter().any(|q| q.needs_review)
    }
}

/// `round(100 * score / max)` with halves rounded up; zero when nothing can be scored.
pub fn percentage(score: u32, max_score: u32) -> u32 {
    if max_score == 0 {
        return 0;
    }
    let score = u64::from(score.min(max_score));
    let max = u64::from(max_score);
    ((200 * score + max) / (2 * max)) as u32
}

pub struct ScoringService;

impl ScoringService {
    /// Multiple-choice questions are all-or-nothing: the selected set must equal the
    /// correct set exactly.
    pub fn score(test: &Test, answers: &UserAnswerState) -> ScoreSheet {
        let mut score: u32 = 0;
        let mut max_score: u32 = 0;
        let mut questions = Vec::with_capacity(test.questions().len());

        for q in test.questions() {
            max_score = max_score.saturating_add(q.points);
            let graded = Self::score_question(q, answers);
            score = score.saturating_add(graded.points_earned);
            questions.push(graded);
        }

        let percentage = percentage(score, max_score);
        ScoreSheet {
            score,
            max_score,
            percentage,
            passed: percentage >= test.passing_score,
            questions,
        }
    }

    fn score_question(q: &Question, answers: &UserAnswerState) -> QuestionScore {
        let mut graded = QuestionScore {
            question_id: q.id,
            question_type: q.question_type(),
            points_earned: 0,
            max_points: q.points,
            is_correct: false,
            needs_review: false,
            selected: Vec::new(),
            text: None,
        };

        match &q.kind {
            QuestionKind::FreeText => {
                if let Some(text) = answers.text(q.id).filter(|t| !t.trim().is_empty()) {
                    graded.text = Some(text.to_string());
                    graded.needs_review = true;
                }
            }
            QuestionKind::SingleChoice(choices) | QuestionKind::MultipleChoice(choices) => {
                let selected = answers.selected(q.id);
                graded.selected = selected
                    .iter()
                    .map(|id| SelectedOption {
                        answer_id: *id,
                        is_correct: choices.get(*id).is_some_and(|a| a.is_correct),
                    })
                    .collect();

                graded.is_correct = match &q.kind {
                    QuestionKind::SingleChoice(_) => {
                        graded.selected.len() == 1 && graded.selected[0].is_correct
                    }
                    _ => !choices.is_empty() && selected == choices.correct_ids(),
                };
                if graded.is_correct {
                    graded.points_earned = q.points;
                }
            }
        }
        graded
    }
}
