//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest participant identity accepted from clients.
pub const MAX_PARTICIPANT_ID_LEN: usize = 64;

/// Validates that a participant ID is 1 to 64 characters of `[A-Za-z0-9._@:-]`.
///
/// # Examples
///
/// ```ignore
/// validate_participant_id("user-42")       // Ok
/// validate_participant_id("alice@example") // Ok
/// validate_participant_id("")              // Err - empty
/// validate_participant_id("bob smith")     // Err - space
/// ```
pub fn validate_participant_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_PARTICIPANT_ID_LEN {
        let mut err = ValidationError::new("participant_id_length");
        err.message = Some(
            format!(
                "Participant ID must be between 1 and {MAX_PARTICIPANT_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'))
    {
        let mut err = ValidationError::new("participant_id_format");
        err.message = Some("Participant ID contains unsupported characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a topic is non-blank.
pub fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.trim().is_empty() {
        let mut err = ValidationError::new("topic_blank");
        err.message = Some("Topic must not be blank".into());
        return Err(err);
    }
    Ok(())
}
