use serde::{Deserialize, Serialize};

use crate::dao::models::MatchEntity;

pub const MATCH_PREFIX: &str = "match::";

/// CouchDB document wrapping a match record. `_rev` is CouchDB's own
/// optimistic-lock token; the embedded `version` is what callers compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchMatchDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: MatchEntity,
}

impl CouchMatchDocument {
    pub fn new(body: MatchEntity, rev: Option<String>) -> Self {
        Self {
            id: match_doc_id(&body.code),
            rev,
            body,
        }
    }
}

pub fn match_doc_id(code: &str) -> String {
    format!("{MATCH_PREFIX}{code}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::versus::{Difficulty, Match, MatchCode, MatchMode, MatchSettings};

    #[test]
    fn document_keeps_couch_metadata_beside_the_record() {
        let entity: MatchEntity = Match::invite(
            MatchCode::parse("QWE234").unwrap(),
            MatchMode::Elimination,
            "p1".into(),
            "p2".into(),
            MatchSettings {
                topic: "SOA-C02".into(),
                difficulty: Difficulty::Easy,
            },
        )
        .into();

        let value = serde_json::to_value(CouchMatchDocument::new(entity.clone(), None)).unwrap();
        assert_eq!(value["_id"], "match::QWE234");
        assert!(value.get("_rev").is_none());
        assert_eq!(value["version"], 0);

        let decoded: CouchMatchDocument = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.body, entity);
    }
}
