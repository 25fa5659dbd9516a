//! Generated content consumed by the mode engines.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Multiple-choice question produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Question text.
    pub prompt: String,
    /// Candidate answers.
    pub choices: Vec<String>,
    /// Index of the correct entry in `choices`.
    pub answer_index: usize,
    /// Optional explanation shown after answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// A question is playable when it has choices and the answer points at one.
    pub fn is_playable(&self) -> bool {
        !self.prompt.trim().is_empty() && self.answer_index < self.choices.len()
    }
}

/// Deployment scenario both players answer in submission-barrier mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    /// Short title.
    pub title: String,
    /// Scenario description.
    pub scenario: String,
    /// Constraints the answer has to satisfy.
    #[serde(default)]
    pub requirements: Vec<String>,
}

/// Content fetched by `start`, shaped by the match mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeContent {
    /// Question set for elimination and buzz race.
    Questions(Vec<Question>),
    /// Scenario for the submission barrier.
    Brief(Brief),
}
