//! Question Bank
//!
//! Read-through cache of the question bank: per-part counts and questions
//! grouped by part in server order. Local state changes only by replacing it
//! with a fresh server response or by applying a [`BankPatch`] after the
//! server confirmed the matching mutation.

use std::collections::BTreeMap;

use crate::models::{Confirmation, Part, Question, QuestionCounts, QuestionEntry};

/// Questions grouped by part, each group in server order
pub type GroupedQuestions = BTreeMap<Part, Vec<QuestionEntry>>;

/// Group a server listing by part
///
/// Every question lands in exactly one group and keeps its relative order.
/// Parts with no questions have no key.
pub fn group_by_part(questions: Vec<Question>) -> GroupedQuestions {
    let mut grouped = GroupedQuestions::new();
    for question in questions {
        grouped
            .entry(question.part)
            .or_default()
            .push(QuestionEntry::from(question));
    }
    grouped
}

/// Cache change to apply once the server has accepted a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankPatch {
    /// A question was created in `part`
    Append { part: Part, question: String },
    /// The text of question `id` was replaced
    Replace { part: Part, id: u64, question: String },
    /// Question `id` was deleted
    Remove { part: Part, id: u64 },
}

impl BankPatch {
    pub fn part(&self) -> Part {
        match self {
            BankPatch::Append { part, .. }
            | BankPatch::Replace { part, .. }
            | BankPatch::Remove { part, .. } => *part,
        }
    }
}

/// Cached counts and grouped questions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionBank {
    counts: QuestionCounts,
    groups: GroupedQuestions,
}

impl QuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> QuestionCounts {
        self.counts
    }

    pub fn groups(&self) -> &GroupedQuestions {
        &self.groups
    }

    /// Questions of one part; empty when the part has none cached
    pub fn group(&self, part: Part) -> &[QuestionEntry] {
        self.groups.get(&part).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, part: Part, id: u64) -> Option<&QuestionEntry> {
        self.group(part).iter().find(|q| q.id == id)
    }

    /// Replace counts with a fresh `/count` response
    pub fn set_counts(&mut self, counts: QuestionCounts) {
        self.counts = counts;
    }

    /// Replace all groups with a fresh `/all-questions` response
    pub fn replace_all(&mut self, questions: Vec<Question>) {
        self.groups = group_by_part(questions);
    }

    /// Apply a confirmed mutation
    ///
    /// `Append` adds the entry only when the confirmation carries the new id;
    /// the count is bumped either way.
    pub fn apply(&mut self, patch: &BankPatch, confirmation: &Confirmation) {
        match patch {
            BankPatch::Append { part, question } => {
                *self.counts.get_mut(*part) += 1;
                if let Some(id) = confirmation.id {
                    self.groups.entry(*part).or_default().push(QuestionEntry {
                        id,
                        question: question.clone(),
                    });
                }
            }
            BankPatch::Replace { part, id, question } => {
                if let Some(entry) = self
                    .groups
                    .get_mut(part)
                    .and_then(|group| group.iter_mut().find(|q| q.id == *id))
                {
                    entry.question = question.clone();
                }
            }
            BankPatch::Remove { part, id } => {
                let count = self.counts.get_mut(*part);
                *count = count.saturating_sub(1);

                if let Some(group) = self.groups.get_mut(part) {
                    group.retain(|q| q.id != *id);
                    if group.is_empty() {
                        self.groups.remove(part);
                    }
                }
            }
        }
    }
}
