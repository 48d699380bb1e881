//! Localized resource strings
//!
//! Messages live in an embedded TOML table with three sections:
//! `messages` (sentences), `entities` (display names of resources) and
//! `fields` (display names of input fields). Lookups never fail: an unknown
//! key yields the key itself so a missing translation is visible, not fatal.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

const EMBEDDED_MESSAGES: &str = include_str!("../resources/messages.toml");

static RESOURCES: Lazy<ResourceService> = Lazy::new(|| {
    ResourceService::from_toml_str(EMBEDDED_MESSAGES).unwrap_or_else(|e| {
        tracing::error!("Embedded resource table is invalid: {}", e);
        ResourceService::default()
    })
});

/// Process-wide resource table
pub fn global() -> &'static ResourceService {
    &RESOURCES
}

/// Message keys
pub mod keys {
    pub const INTERNAL_SERVER_ERROR: &str = "internal_server_error";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const ACCOUNT_LOCKED: &str = "account_locked";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    pub const EMAIL_IN_USE: &str = "email_in_use";
    pub const PENDING_REGISTRATION_EXISTS: &str = "pending_registration_exists";
    pub const INVALID_AGE_RANGE: &str = "invalid_age_range";
    pub const INVALID_DATE_RANGE: &str = "invalid_date_range";
    pub const INVALID_TIME_RANGE: &str = "invalid_time_range";
    pub const INVALID_WEEKDAY: &str = "invalid_weekday";
    pub const INVALID_SCORE_RANGE: &str = "invalid_score_range";
    pub const SCORE_RANGE_OVERLAP: &str = "score_range_overlap";
    pub const DATE_IN_FUTURE: &str = "date_in_future";
    pub const DATE_IN_PAST: &str = "date_in_past";
    pub const ALREADY_PROCESSED: &str = "already_processed";
    pub const REJECTION_REASON_REQUIRED: &str = "rejection_reason_required";
    pub const INVALID_STATUS: &str = "invalid_status";
    pub const TIME_SLOT_OVERLAP: &str = "time_slot_overlap";
    pub const SCHEDULE_OVERLAP: &str = "schedule_overlap";
    pub const REPORT_OVERLAP: &str = "report_overlap";
    pub const ONLY_PENDING_DELETABLE: &str = "only_pending_deletable";
    pub const ONLY_NOT_YET_CHANGEABLE: &str = "only_not_yet_changeable";
    pub const PROFILE_NOT_TEACHING: &str = "profile_not_teaching";
    pub const QUESTION_ANSWERED_TWICE: &str = "question_answered_twice";
    pub const OPTION_NOT_IN_QUESTION: &str = "option_not_in_question";
    pub const QUESTION_NOT_IN_TEST: &str = "question_not_in_test";
    pub const OPTIONS_REQUIRED: &str = "options_required";
    pub const REQUIRED_FIELD: &str = "required_field";
    pub const UPLOAD_MISSING_FILE: &str = "upload_missing_file";
    pub const UPLOAD_UNSUPPORTED_TYPE: &str = "upload_unsupported_type";
    pub const UPLOAD_TOO_LARGE: &str = "upload_too_large";
    pub const PASSWORD_TOO_SHORT: &str = "password_too_short";
    pub const PASSWORD_INCORRECT: &str = "password_incorrect";
}

/// Entity display-name keys
pub mod entities {
    pub const USER: &str = "user";
    pub const TUTOR: &str = "tutor";
    pub const TUTOR_REGISTRATION_REQUEST: &str = "tutor_registration_request";
    pub const CERTIFICATE: &str = "certificate";
    pub const WORK_EXPERIENCE: &str = "work_experience";
    pub const CURRICULUM: &str = "curriculum";
    pub const EXERCISE_TYPE: &str = "exercise_type";
    pub const EXERCISE: &str = "exercise";
    pub const SYLLABUS: &str = "syllabus";
    pub const CHILD_INFORMATION: &str = "child_information";
    pub const TUTOR_REQUEST: &str = "tutor_request";
    pub const STUDENT_PROFILE: &str = "student_profile";
    pub const SCHEDULE_TIME_SLOT: &str = "schedule_time_slot";
    pub const SCHEDULE: &str = "schedule";
    pub const ASSESSMENT_QUESTION: &str = "assessment_question";
    pub const ASSESSMENT_OPTION: &str = "assessment_option";
    pub const ASSESSMENT_SCORE_RANGE: &str = "assessment_score_range";
    pub const PROGRESS_REPORT: &str = "progress_report";
    pub const TEST: &str = "test";
    pub const TEST_QUESTION: &str = "test_question";
    pub const TEST_RESULT: &str = "test_result";
    pub const NOTIFICATION: &str = "notification";
    pub const MEDIA: &str = "media";
}

/// Field display-name keys
pub mod fields {
    pub const BIRTH_DATE: &str = "birth_date";
    pub const SCHEDULE_DATE: &str = "schedule_date";
    pub const START_TIME: &str = "start_time";
    pub const REPORT_END_DATE: &str = "report_end_date";
    pub const CERTIFICATE_NAME: &str = "certificate_name";
    pub const EXERCISE_TYPE_NAME: &str = "exercise_type_name";
    pub const EXERCISE_NAME: &str = "exercise_name";
    pub const TEST_NAME: &str = "test_name";
    pub const QUESTION: &str = "question";
    pub const FULL_NAME: &str = "full_name";
    pub const EMAIL: &str = "email";
    pub const DESCRIPTION: &str = "description";
    pub const PHONE_NUMBER: &str = "phone_number";
    pub const ISSUING_DATE: &str = "issuing_date";
    pub const START_DATE: &str = "start_date";
    pub const CHILD_NAME: &str = "child_name";
    pub const SCORE_DESCRIPTION: &str = "score_description";
}

#[derive(Debug, Default, Deserialize)]
struct ResourceTable {
    #[serde(default)]
    messages: HashMap<String, String>,
    #[serde(default)]
    entities: HashMap<String, String>,
    #[serde(default)]
    fields: HashMap<String, String>,
}

/// Lookup service for localized strings
#[derive(Debug, Default)]
pub struct ResourceService {
    table: ResourceTable,
}

impl ResourceService {
    /// Parse a resource table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: ResourceTable = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid resource table: {}", e)))?;
        Ok(Self { table })
    }

    /// Message for `key`, or the key itself when absent
    pub fn get(&self, key: &str) -> String {
        self.table
            .messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Message for `key` with `{0}`, `{1}`… replaced by `args`
    pub fn format(&self, key: &str, args: &[&str]) -> String {
        let mut message = self.get(key);
        for (i, arg) in args.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), arg);
        }
        message
    }

    /// Display name of an entity key
    pub fn entity(&self, key: &str) -> String {
        self.table
            .entities
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Display name of a field key
    pub fn field(&self, key: &str) -> String {
        self.table
            .fields
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// "`<Entity>` was not found."
    pub fn not_found(&self, entity: &str) -> String {
        self.format(keys::NOT_FOUND, &[&self.entity(entity)])
    }

    /// "`<Entity>` already exists."
    pub fn duplicate(&self, entity: &str) -> String {
        self.format(keys::DUPLICATE, &[&self.entity(entity)])
    }

    /// "`<Entity>` has already been processed."
    pub fn already_processed(&self, entity: &str) -> String {
        self.format(keys::ALREADY_PROCESSED, &[&self.entity(entity)])
    }

    /// "`<Field>` is required."
    pub fn required(&self, field: &str) -> String {
        self.format(keys::REQUIRED_FIELD, &[&self.field(field)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_table_loads() {
        let resources = global();
        assert_eq!(
            resources.get(keys::FORBIDDEN),
            "You do not have permission to perform this action."
        );
    }

    #[test]
    fn test_format_replaces_positional_args() {
        let resources = global();
        assert_eq!(resources.not_found(entities::CERTIFICATE), "Certificate was not found.");
        assert_eq!(
            resources.format(keys::EMAIL_IN_USE, &["a@b.c"]),
            "The email a@b.c is already in use."
        );
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        let resources = ResourceService::from_toml_str("[messages]\n").unwrap();
        assert_eq!(resources.get("missing_key"), "missing_key");
        assert_eq!(resources.entity("thing"), "thing");
    }

    #[test]
    fn test_every_key_constant_is_defined() {
        let resources = global();
        for key in [
            keys::NOT_FOUND,
            keys::TIME_SLOT_OVERLAP,
            keys::INVALID_SCORE_RANGE,
            keys::REJECTION_REASON_REQUIRED,
            keys::QUESTION_ANSWERED_TWICE,
        ] {
            assert_ne!(resources.get(key), key, "missing message for {}", key);
        }
    }
}
