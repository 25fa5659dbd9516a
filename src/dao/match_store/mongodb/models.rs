use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use super::error::MongoDaoError;
use crate::{
    dao::models::MatchEntity,
    state::{
        modes::ModeState,
        versus::{FinishReason, MatchMode, MatchSettings, MatchStatus, Winner},
    },
};

/// BSON layout of a match: the code is the `_id`, counters are signed and
/// timestamps are native dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    code: String,
    mode: MatchMode,
    participant_a: String,
    participant_b: String,
    status: MatchStatus,
    score_a: i64,
    score_b: i64,
    #[serde(default)]
    winner: Option<Winner>,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
    #[serde(default)]
    mode_state: Option<ModeState>,
    settings: MatchSettings,
    created_at: DateTime,
    #[serde(default)]
    completed_at: Option<DateTime>,
    version: i64,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            code: value.code,
            mode: value.mode,
            participant_a: value.participant_a,
            participant_b: value.participant_b,
            status: value.status,
            score_a: i64::from(value.score_a),
            score_b: i64::from(value.score_b),
            winner: value.winner,
            finish_reason: value.finish_reason,
            mode_state: value.mode_state,
            settings: value.settings,
            created_at: DateTime::from_system_time(value.created_at),
            completed_at: value.completed_at.map(DateTime::from_system_time),
            version: version_as_i64(value.version),
        }
    }
}

impl TryFrom<MongoMatchDocument> for MatchEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoMatchDocument) -> Result<Self, Self::Error> {
        let corrupted = |reason: &str| MongoDaoError::Corrupted {
            code: value.code.clone(),
            reason: reason.to_owned(),
        };
        let score_a = u32::try_from(value.score_a).map_err(|_| corrupted("score_a out of range"))?;
        let score_b = u32::try_from(value.score_b).map_err(|_| corrupted("score_b out of range"))?;
        let version = u64::try_from(value.version).map_err(|_| corrupted("negative version"))?;

        Ok(Self {
            code: value.code,
            mode: value.mode,
            participant_a: value.participant_a,
            participant_b: value.participant_b,
            status: value.status,
            score_a,
            score_b,
            winner: value.winner,
            finish_reason: value.finish_reason,
            mode_state: value.mode_state,
            settings: value.settings,
            created_at: value.created_at.to_system_time(),
            completed_at: value.completed_at.map(DateTime::to_system_time),
            version,
        })
    }
}

fn version_as_i64(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

pub fn doc_id(code: &str) -> Document {
    doc! { "_id": code }
}

/// Filter matching `code` only while it still carries `version`.
pub fn versioned_doc_id(code: &str, version: u64) -> Document {
    doc! { "_id": code, "version": version_as_i64(version) }
}
