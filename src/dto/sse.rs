use serde::Serialize;
use utoipa::ToSchema;

/// Event name carrying a [`crate::dto::match_dto::MatchView`] after each write.
pub const MATCH_STATE_EVENT: &str = "match.state";
/// Event name carrying an [`crate::dto::match_dto::ActionResponse`] back to the
/// WebSocket client that issued the action.
pub const MATCH_ACK_EVENT: &str = "match.ack";
/// Event name carrying an [`ActionRejected`] back to a WebSocket client.
pub const MATCH_ERROR_EVENT: &str = "match.error";

#[derive(Clone, Debug, PartialEq, Eq)]
/// Dispatched payload carried across the fan-out channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// WebSocket text frame: `{"event": <name>, "data": <payload>}`.
    pub fn to_ws_text(&self) -> String {
        let name = serde_json::to_string(&self.event).unwrap_or_else(|_| "null".into());
        format!(r#"{{"event":{name},"data":{}}}"#, self.data)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Sent over the WebSocket when an inbound action is rejected.
pub struct ActionRejected {
    /// Stable error code (`NOT_YOUR_TURN`, `ALREADY_BUZZED`, ...).
    pub code: String,
    /// Human-readable reason.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_frames_embed_the_payload_verbatim() {
        let event = ServerEvent::json(
            Some(MATCH_ERROR_EVENT.to_string()),
            &ActionRejected {
                code: "NOT_YOUR_TURN".into(),
                message: "it is not your turn".into(),
            },
        )
        .unwrap();

        let frame: serde_json::Value = serde_json::from_str(&event.to_ws_text()).unwrap();
        assert_eq!(frame["event"], MATCH_ERROR_EVENT);
        assert_eq!(frame["data"]["code"], "NOT_YOUR_TURN");
    }
}
