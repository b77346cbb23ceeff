use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::answer::Answer;
use crate::models::ids::{AnswerId, EmployeeId, QuestionId, TestId};
use crate::models::question::{ChoiceSet, ModelError, Question, QuestionKind, QuestionType};
use crate::models::test::Test;
use crate::utils::serde_flex::{bool_flexible, opt_u32_flexible};

/// Response envelope used by every backend action.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDto {
    pub id: TestId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub time_limit: Option<u32>,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub passing_score: Option<u32>,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub questions: Option<Vec<QuestionDto>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDto {
    pub id: QuestionId,
    pub question_text: String,
    #[serde(default = "default_question_type")]
    pub question_type: QuestionType,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub points: Option<u32>,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub order_num: Option<u32>,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub answers: Option<Vec<AnswerDto>>,
}

fn default_question_type() -> QuestionType {
    QuestionType::SingleChoice
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDto {
    pub id: AnswerId,
    pub answer_text: String,
    #[serde(default, deserialize_with = "bool_flexible")]
    pub is_correct: bool,
    #[serde(default, deserialize_with = "opt_u32_flexible")]
    pub order_num: Option<u32>,
}

const DEFAULT_POINTS: u32 = 1;
const DEFAULT_PASSING_SCORE: u32 = 70;

impl TestDto {
    /// Builds the domain test. Individual malformed questions degrade instead of failing
    /// the whole test: a broken answer key leaves the question with no selectable options,
    /// and an unknown type is treated as free text.
    pub fn into_test(self) -> Result<Test, ModelError> {
        let mut questions = self.questions.unwrap_or_default();
        questions.sort_by_key(|q| q.order_num.unwrap_or(u32::MAX));

        let questions = questions.into_iter().map(QuestionDto::into_question).collect();

        let mut test = Test::new(
            self.id,
            self.title,
            self.passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
            questions,
        )?
        .with_time_limit(self.time_limit.unwrap_or(0))
        .with_max_attempts(self.max_attempts.unwrap_or(0));
        test.description = self.description;
        Ok(test)
    }
}

impl QuestionDto {
    pub fn into_question(self) -> Question {
        let id = self.id;
        let mut answers = self.answers.unwrap_or_default();
        answers.sort_by_key(|a| a.order_num.unwrap_or(u32::MAX));
        let options: Vec<Answer> = answers
            .into_iter()
            .map(|a| Answer::new(a.id, a.answer_text, a.is_correct))
            .collect();

        let kind = match self.question_type {
            QuestionType::SingleChoice => {
                QuestionKind::SingleChoice(choices_or_empty(id, ChoiceSet::single(id, options)))
            }
            QuestionType::MultipleChoice => {
                QuestionKind::MultipleChoice(choices_or_empty(id, ChoiceSet::multiple(id, options)))
            }
            QuestionType::Text => QuestionKind::FreeText,
            QuestionType::Unknown => {
                tracing::warn!(question_id = %id, "Unknown question type, loading as free text");
                QuestionKind::FreeText
            }
        };

        let mut question = Question::new(
            id,
            self.question_text,
            self.points.unwrap_or(DEFAULT_POINTS),
            kind,
        );
        question.time_limit_seconds = self.time_limit.filter(|s| *s > 0);
        question.explanation = self.explanation.filter(|e| !e.trim().is_empty());
        question
    }
}

fn choices_or_empty(question: QuestionId, built: Result<ChoiceSet, ModelError>) -> ChoiceSet {
    match built {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(question_id = %question, error = %e, "Malformed answer key, question will not be scored");
            ChoiceSet::empty()
        }
    }
}

/// One `user_answers` row of the submit payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnswerRow {
    pub question_id: QuestionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_id: Option<AnswerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
    pub is_correct: bool,
    pub points_earned: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResultRequest {
    pub test_id: TestId,
    pub employee_id: EmployeeId,
    pub score: u32,
    pub max_score: u32,
    pub attempt_number: u32,
    pub time_spent: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_title: Option<String>,
    pub user_answers: Vec<UserAnswerRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
    Assignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub employee_id: EmployeeId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_backend_test_in_display_order() {
        let raw = json!({
            "id": 5,
            "title": "Safety",
            "description": "Basics",
            "time_limit": "10",
            "passing_score": "60.00",
            "max_attempts": 3,
            "questions": [
                {
                    "id": 2, "question_text": "Second", "question_type": "multiple_choice",
                    "points": 2, "order_num": 2,
                    "answers": [
                        {"id": 21, "answer_text": "x", "is_correct": 1, "order_num": 1},
                        {"id": 22, "answer_text": "y", "is_correct": "true", "order_num": 2}
                    ]
                },
                {
                    "id": 1, "question_text": "First", "question_type": "single_choice",
                    "points": 1, "order_num": 1, "time_limit": 30,
                    "answers": [
                        {"id": 12, "answer_text": "b", "is_correct": false, "order_num": 2},
                        {"id": 11, "answer_text": "a", "is_correct": true, "order_num": 1}
                    ]
                }
            ]
        });
        let dto: TestDto = serde_json::from_value(raw).unwrap();
        let test = dto.into_test().unwrap();

        assert_eq!(test.passing_score, 60);
        assert_eq!(test.session_seconds(), Some(600));
        assert_eq!(test.max_attempts, 3);
        assert_eq!(test.max_score(), 3);
        let ids: Vec<_> = test.questions().iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![QuestionId(1), QuestionId(2)]);

        let first = &test.questions()[0];
        assert_eq!(first.time_limit_seconds, Some(30));
        let opts: Vec<_> = first.choices().unwrap().options().iter().map(|a| a.id).collect();
        assert_eq!(opts, vec![AnswerId(11), AnswerId(12)]);
        assert_eq!(test.questions()[1].choices().unwrap().correct_ids().len(), 2);
    }

    #[test]
    fn malformed_questions_degrade_instead_of_failing() {
        let raw = json!({
            "id": 9,
            "title": "Broken",
            "questions": [
                {"id": 1, "question_text": "No answers", "question_type": "single_choice", "answers": null},
                {"id": 2, "question_text": "Two keys", "question_type": "single_choice",
                 "answers": [
                    {"id": 1, "answer_text": "a", "is_correct": true},
                    {"id": 2, "answer_text": "b", "is_correct": true}
                 ]},
                {"id": 3, "question_text": "Essay", "question_type": "essay"}
            ]
        });
        let dto: TestDto = serde_json::from_value(raw).unwrap();
        let test = dto.into_test().unwrap();

        assert!(test.questions()[0].choices().unwrap().is_empty());
        assert!(test.questions()[1].choices().unwrap().is_empty());
        assert_eq!(test.questions()[2].kind, QuestionKind::FreeText);
        assert_eq!(test.time_limit_minutes, None);
        assert_eq!(test.passing_score, DEFAULT_PASSING_SCORE);
    }

    #[test]
    fn submit_payload_omits_absent_answer_fields() {
        let row = UserAnswerRow {
            question_id: QuestionId(3),
            answer_id: Some(AnswerId(30)),
            answer_text: None,
            is_correct: true,
            points_earned: 1.0,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(
            value,
            json!({"question_id": 3, "answer_id": 30, "is_correct": true, "points_earned": 1.0})
        );
    }
}
