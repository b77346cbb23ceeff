use serde::Serialize;
use std::sync::Arc;

use crate::dto::backend_dto::SubmitResultRequest;
use crate::error::Result;
use crate::models::ids::{AnswerId, EmployeeId, QuestionId, ResultId, TestId};
use crate::models::question::QuestionType;
use crate::models::test::Test;
use crate::models::test_result::TestResult;
use crate::services::backend_service::TestsApi;
use crate::services::scoring_service::ScoreSheet;
use crate::utils::time::format_clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMark {
    /// The option is part of the answer key.
    Correct,
    /// Selected by the employee but not part of the key.
    WrongSelection,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionReport {
    pub answer_id: AnswerId,
    pub text: String,
    pub correct: bool,
    pub selected: bool,
    pub mark: OptionMark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionReport {
    pub question_id: QuestionId,
    pub text: String,
    pub question_type: QuestionType,
    pub points_earned: u32,
    pub max_points: u32,
    pub is_correct: bool,
    pub needs_review: bool,
    pub explanation: Option<String>,
    pub options: Vec<OptionReport>,
    pub text_answer: Option<String>,
}

/// What the employee sees once an attempt is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultReport {
    pub result_id: ResultId,
    pub test_id: TestId,
    pub test_title: String,
    pub employee_id: EmployeeId,
    pub attempt_number: u32,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub passing_score: u32,
    pub passed: bool,
    /// Percentage and verdict as echoed by the backend, which may round differently.
    pub backend_percentage: Option<u32>,
    pub backend_passed: Option<bool>,
    pub time_spent_seconds: u32,
    pub time_spent: String,
    pub needs_review: bool,
    pub questions: Vec<QuestionReport>,
}

impl ResultReport {
    /// Percentage and pass/fail always come from the score sheet.
    pub fn build(
        test: &Test,
        sheet: &ScoreSheet,
        persisted: &TestResult,
        employee_id: EmployeeId,
        attempt_number: u32,
        time_spent_seconds: u32,
    ) -> Self {
        let questions = test
            .questions()
            .iter()
            .zip(&sheet.questions)
            .map(|(question, graded)| {
                let options = question
                    .choices()
                    .map(|set| {
                        set.options()
                            .iter()
                            .map(|option| {
                                let selected =
                                    graded.selected.iter().any(|s| s.answer_id == option.id);
                                let mark = if option.is_correct {
                                    OptionMark::Correct
                                } else if selected {
                                    OptionMark::WrongSelection
                                } else {
                                    OptionMark::Neutral
                                };
                                OptionReport {
                                    answer_id: option.id,
                                    text: option.text.clone(),
                                    correct: option.is_correct,
                                    selected,
                                    mark,
                                }
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                QuestionReport {
                    question_id: question.id,
                    text: question.text.clone(),
                    question_type: question.question_type(),
                    points_earned: graded.points_earned,
                    max_points: graded.max_points,
                    is_correct: graded.is_correct,
                    needs_review: graded.needs_review,
                    explanation: question.explanation.clone(),
                    options,
                    text_answer: graded.text.clone(),
                }
            })
            .collect();

        Self {
            result_id: persisted.id,
            test_id: test.id,
            test_title: test.title.clone(),
            employee_id,
            attempt_number,
            score: sheet.score,
            max_score: sheet.max_score,
            percentage: sheet.percentage,
            passing_score: test.passing_score,
            passed: sheet.passed,
            backend_percentage: persisted.percentage,
            backend_passed: persisted.passed,
            time_spent_seconds,
            time_spent: format_clock(time_spent_seconds),
            needs_review: sheet.needs_review(),
            questions,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} points ({}%), {}",
            self.test_title,
            self.score,
            self.max_score,
            self.percentage,
            if self.passed { "passed" } else { "not passed" }
        )
    }
}

/// Delivers computed results to the tests backend.
#[derive(Clone)]
pub struct ResultReporter {
    api: Arc<dyn TestsApi>,
}

impl ResultReporter {
    pub fn new(api: Arc<dyn TestsApi>) -> Self {
        Self { api }
    }

    pub async fn submit(&self, request: &SubmitResultRequest) -> Result<TestResult> {
        tracing::info!(
            test_id = %request.test_id,
            employee_id = %request.employee_id,
            attempt = request.attempt_number,
            score = request.score,
            max_score = request.max_score,
            "Submitting test result"
        );
        let persisted = self.api.submit_result(request).await?;
        tracing::info!(result_id = %persisted.id, "Test result persisted");
        Ok(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer::Answer;
    use crate::models::question::{ChoiceSet, Question, QuestionKind};
    use crate::services::backend_service::MockTestsApi;
    use crate::services::scoring_service::ScoringService;
    use crate::session::UserAnswerState;

    fn test_with_multi() -> (Test, Question) {
        let set = ChoiceSet::multiple(
            QuestionId(1),
            vec![
                Answer::new(1, "A", true),
                Answer::new(2, "B", true),
                Answer::new(3, "C", false),
            ],
        )
        .unwrap();
        let q = Question::new(1, "Which?", 2, QuestionKind::MultipleChoice(set))
            .with_explanation("A and B");
        let test = Test::new(3, "Quiz", 60, vec![q.clone()]).unwrap();
        (test, q)
    }

    fn persisted(raw: serde_json::Value) -> TestResult {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn marks_key_and_wrong_selections() {
        let (test, q) = test_with_multi();
        let mut answers = UserAnswerState::new();
        answers.select(&q, AnswerId(1)).unwrap();
        answers.select(&q, AnswerId(3)).unwrap();
        let sheet = ScoringService::score(&test, &answers);

        let report = ResultReport::build(
            &test,
            &sheet,
            &persisted(serde_json::json!({"id": 5})),
            EmployeeId(8),
            2,
            75,
        );
        let marks: Vec<_> = report.questions[0].options.iter().map(|o| o.mark).collect();
        assert_eq!(
            marks,
            vec![OptionMark::Correct, OptionMark::Correct, OptionMark::WrongSelection]
        );
        assert_eq!(report.questions[0].explanation.as_deref(), Some("A and B"));
        assert_eq!(report.time_spent, "1:15");
        assert_eq!(report.percentage, 0);
        assert!(!report.passed);
        assert_eq!(report.summary(), "Quiz: 0/2 points (0%), not passed");
    }

    #[test]
    fn report_keeps_the_sheet_verdict_over_a_truncated_echo() {
        let single = |id: i64| {
            let set = ChoiceSet::single(
                QuestionId(id),
                vec![Answer::new(id * 10 + 1, "yes", true), Answer::new(id * 10 + 2, "no", false)],
            )
            .unwrap();
            Question::new(id, "q", 1, QuestionKind::SingleChoice(set))
        };
        let qs = vec![single(1), single(2), single(3)];
        let test = Test::new(4, "Thirds", 67, qs.clone()).unwrap();
        let mut answers = UserAnswerState::new();
        answers.select(&qs[0], AnswerId(11)).unwrap();
        answers.select(&qs[1], AnswerId(21)).unwrap();
        let sheet = ScoringService::score(&test, &answers);
        assert_eq!((sheet.percentage, sheet.passed), (67, true));

        let report = ResultReport::build(
            &test,
            &sheet,
            &persisted(serde_json::json!({"id": 5, "percentage": 66, "passed": false})),
            EmployeeId(8),
            1,
            0,
        );
        assert_eq!(report.percentage, sheet.percentage);
        assert_eq!(report.passed, sheet.passed);
        assert_eq!(report.backend_percentage, Some(66));
        assert_eq!(report.backend_passed, Some(false));
        assert_eq!(report.summary(), "Thirds: 2/3 points (67%), passed");
    }

    #[tokio::test]
    async fn submit_propagates_backend_errors() {
        let mut api = MockTestsApi::new();
        api.expect_submit_result()
            .times(1)
            .returning(|_| Err(crate::error::Error::Backend("boom".into())));
        let reporter = ResultReporter::new(Arc::new(api));

        let request = SubmitResultRequest {
            test_id: TestId(1),
            employee_id: EmployeeId(2),
            score: 0,
            max_score: 0,
            attempt_number: 1,
            time_spent: 0,
            test_title: None,
            user_answers: vec![],
        };
        let err = reporter.submit(&request).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Backend(_)));
    }
}
