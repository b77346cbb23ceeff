use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::answer::Answer;
use crate::models::ids::{AnswerId, QuestionId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("question {question} lists answer {answer} more than once")]
    DuplicateAnswer { question: QuestionId, answer: AnswerId },

    #[error("single-choice question {question} must have exactly one correct answer, found {found}")]
    SingleChoiceKey { question: QuestionId, found: usize },

    #[error("multiple-choice question {question} must have at least one correct answer")]
    MultipleChoiceKey { question: QuestionId },

    #[error("test lists question {0} more than once")]
    DuplicateQuestion(QuestionId),
}

/// Wire-level question type as the tests backend names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    #[serde(alias = "free_text")]
    Text,
    #[serde(other)]
    Unknown,
}

/// Ordered answer options of a choice question together with its answer key.
///
/// An empty set is legal and means the question has no selectable options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChoiceSet {
    options: Vec<Answer>,
}

impl ChoiceSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(question: QuestionId, options: Vec<Answer>) -> Result<Self, ModelError> {
        let set = Self::unique(question, options)?;
        let found = set.correct_ids().len();
        if !set.options.is_empty() && found != 1 {
            return Err(ModelError::SingleChoiceKey { question, found });
        }
        Ok(set)
    }

    pub fn multiple(question: QuestionId, options: Vec<Answer>) -> Result<Self, ModelError> {
        let set = Self::unique(question, options)?;
        if !set.options.is_empty() && set.correct_ids().is_empty() {
            return Err(ModelError::MultipleChoiceKey { question });
        }
        Ok(set)
    }

    fn unique(question: QuestionId, options: Vec<Answer>) -> Result<Self, ModelError> {
        let mut seen = BTreeSet::new();
        for option in &options {
            if !seen.insert(option.id) {
                return Err(ModelError::DuplicateAnswer {
                    question,
                    answer: option.id,
                });
            }
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &[Answer] {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn get(&self, id: AnswerId) -> Option<&Answer> {
        self.options.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: AnswerId) -> bool {
        self.get(id).is_some()
    }

    pub fn correct_ids(&self) -> BTreeSet<AnswerId> {
        self.options
            .iter()
            .filter(|a| a.is_correct)
            .map(|a| a.id)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    SingleChoice(ChoiceSet),
    MultipleChoice(ChoiceSet),
    FreeText,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::SingleChoice(_) => QuestionType::SingleChoice,
            QuestionKind::MultipleChoice(_) => QuestionType::MultipleChoice,
            QuestionKind::FreeText => QuestionType::Text,
        }
    }

    pub fn choices(&self) -> Option<&ChoiceSet> {
        match self {
            QuestionKind::SingleChoice(set) | QuestionKind::MultipleChoice(set) => Some(set),
            QuestionKind::FreeText => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub points: u32,
    /// Per-question countdown in seconds; the session default applies when absent.
    pub time_limit_seconds: Option<u32>,
    pub explanation: Option<String>,
    pub kind: QuestionKind,
}

impl Question {
    pub fn new(id: impl Into<QuestionId>, text: impl Into<String>, points: u32, kind: QuestionKind) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            points,
            time_limit_seconds: None,
            explanation: None,
            kind,
        }
    }

    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit_seconds = Some(seconds);
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    pub fn choices(&self) -> Option<&ChoiceSet> {
        self.kind.choices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qid() -> QuestionId {
        QuestionId(1)
    }

    #[test]
    fn single_choice_requires_exactly_one_correct() {
        let two = vec![Answer::new(1, "a", true), Answer::new(2, "b", true)];
        assert_eq!(
            ChoiceSet::single(qid(), two),
            Err(ModelError::SingleChoiceKey { question: qid(), found: 2 })
        );

        let none = vec![Answer::new(1, "a", false)];
        assert!(ChoiceSet::single(qid(), none).is_err());

        let ok = vec![Answer::new(1, "a", false), Answer::new(2, "b", true)];
        let set = ChoiceSet::single(qid(), ok).unwrap();
        assert_eq!(set.correct_ids(), BTreeSet::from([AnswerId(2)]));
    }

    #[test]
    fn multiple_choice_requires_a_correct_answer() {
        let none = vec![Answer::new(1, "a", false), Answer::new(2, "b", false)];
        assert_eq!(
            ChoiceSet::multiple(qid(), none),
            Err(ModelError::MultipleChoiceKey { question: qid() })
        );
    }

    #[test]
    fn empty_choice_set_is_accepted() {
        assert!(ChoiceSet::single(qid(), vec![]).unwrap().is_empty());
        assert!(ChoiceSet::multiple(qid(), vec![]).unwrap().is_empty());
    }

    #[test]
    fn duplicate_answer_ids_are_rejected() {
        let dup = vec![Answer::new(7, "a", true), Answer::new(7, "b", false)];
        assert_eq!(
            ChoiceSet::multiple(qid(), dup),
            Err(ModelError::DuplicateAnswer { question: qid(), answer: AnswerId(7) })
        );
    }

    #[test]
    fn unknown_question_type_deserializes() {
        let t: QuestionType = serde_json::from_str("\"essay\"").unwrap();
        assert_eq!(t, QuestionType::Unknown);
        let t: QuestionType = serde_json::from_str("\"multiple_choice\"").unwrap();
        assert_eq!(t, QuestionType::MultipleChoice);
    }
}
