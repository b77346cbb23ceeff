use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::ids::{AnswerId, QuestionId};
use crate::models::question::{Question, QuestionKind};
use crate::session::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Choices(BTreeSet<AnswerId>),
    Text(String),
}

impl Selection {
    pub fn is_answered(&self) -> bool {
        match self {
            Selection::Choices(ids) => !ids.is_empty(),
            Selection::Text(text) => !text.trim().is_empty(),
        }
    }
}

/// Selections made during one session, keyed by question.
///
/// All mutation goes through [`select`](Self::select) and [`set_text`](Self::set_text),
/// which check the selection against the question it targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAnswerState {
    selections: BTreeMap<QuestionId, Selection>,
}

impl UserAnswerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single choice replaces the previous pick; multiple choice toggles membership.
    /// Returns whether the state changed.
    pub fn select(&mut self, question: &Question, answer: AnswerId) -> Result<bool, SessionError> {
        let (choices, multiple) = match &question.kind {
            QuestionKind::SingleChoice(set) => (set, false),
            QuestionKind::MultipleChoice(set) => (set, true),
            QuestionKind::FreeText => return Err(SessionError::NotSelectable(question.id)),
        };
        if !choices.contains(answer) {
            return Err(SessionError::UnknownAnswer {
                question: question.id,
                answer,
            });
        }

        if !multiple {
            let next = Selection::Choices(BTreeSet::from([answer]));
            if self.selections.get(&question.id) == Some(&next) {
                return Ok(false);
            }
            self.selections.insert(question.id, next);
            return Ok(true);
        }

        let entry = self
            .selections
            .entry(question.id)
            .or_insert_with(|| Selection::Choices(BTreeSet::new()));
        if let Selection::Choices(ids) = entry {
            if !ids.remove(&answer) {
                ids.insert(answer);
            }
            if ids.is_empty() {
                self.selections.remove(&question.id);
            }
        }
        Ok(true)
    }

    pub fn set_text(&mut self, question: &Question, text: &str) -> Result<bool, SessionError> {
        if !matches!(question.kind, QuestionKind::FreeText) {
            return Err(SessionError::NotFreeText(question.id));
        }
        if text.trim().is_empty() {
            return Ok(self.selections.remove(&question.id).is_some());
        }
        let next = Selection::Text(text.to_string());
        if self.selections.get(&question.id) == Some(&next) {
            return Ok(false);
        }
        self.selections.insert(question.id, next);
        Ok(true)
    }

    pub fn get(&self, question: QuestionId) -> Option<&Selection> {
        self.selections.get(&question)
    }

    /// Selected answer ids for a choice question; empty when nothing is selected.
    pub fn selected(&self, question: QuestionId) -> BTreeSet<AnswerId> {
        match self.selections.get(&question) {
            Some(Selection::Choices(ids)) => ids.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn text(&self, question: QuestionId) -> Option<&str> {
        match self.selections.get(&question) {
            Some(Selection::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_answered(&self, question: QuestionId) -> bool {
        self.selections
            .get(&question)
            .is_some_and(Selection::is_answered)
    }

    pub fn selected_count(&self) -> usize {
        self.selections.values().filter(|s| s.is_answered()).count()
    }
}
