//! Request bodies and boundary validation
//!
//! Bodies deserialize into loose structs (every field optional) so that a
//! single response can list every missing or malformed field. Domain values
//! are only built once all fields pass.

use hemvip_common::{ParticipantIds, ProlificId, SessionId};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::error::{ApiError, FieldError};
use crate::study::Completion;

/// Field names carrying the identifier triple in a given body
struct TripleFields {
    user: &'static str,
    study: &'static str,
    session: &'static str,
}

const START_FIELDS: TripleFields = TripleFields {
    user: "prolificid",
    study: "studyid",
    session: "sessionid",
};

const OWNER_FIELDS: TripleFields = TripleFields {
    user: "prolific_userid",
    study: "prolific_studyid",
    session: "prolific_sessionid",
};

/// Collects field errors across one request
#[derive(Debug, Default)]
struct Violations(Vec<FieldError>);

impl Violations {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn prolific_id(&mut self, field: &'static str, label: &str, raw: Option<&str>) -> Option<ProlificId> {
        let Some(raw) = raw else {
            self.push(field, format!("{} is required", field));
            return None;
        };
        match ProlificId::parse(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                self.push(field, format!("Invalid {} format", label));
                None
            }
        }
    }

    fn session_id(&mut self, field: &'static str, raw: Option<&str>) -> Option<SessionId> {
        let Some(raw) = raw else {
            self.push(field, format!("{} is required", field));
            return None;
        };
        match SessionId::parse(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                self.push(field, "Invalid SESSION_ID format");
                None
            }
        }
    }

    fn participant(
        &mut self,
        fields: &TripleFields,
        user: Option<&str>,
        study: Option<&str>,
        session: Option<&str>,
    ) -> Option<ParticipantIds> {
        let user = self.prolific_id(fields.user, "PROLIFIC_PID", user);
        let study = self.prolific_id(fields.study, "STUDY_ID", study);
        let session = self.session_id(fields.session, session);

        Some(ParticipantIds {
            user: user?,
            study: study?,
            session: session?,
        })
    }

    /// Database study id: positive integer, as a JSON number or numeric string
    fn study_key(&mut self, field: &'static str, raw: Option<&Value>) -> Option<i64> {
        let parsed = match raw {
            None => {
                self.push(field, format!("{} is required", field));
                return None;
            }
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.parse::<i64>().ok(),
            Some(_) => None,
        };

        match parsed {
            Some(id) if id > 0 => Some(id),
            _ => {
                self.push(field, format!("{} must be a positive integer", field));
                None
            }
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ApiError> {
        match value {
            Some(value) if self.0.is_empty() => Ok(value),
            _ => Err(ApiError::validation(self.0)),
        }
    }
}

/// GET /api/study query
#[derive(Debug, Deserialize)]
pub struct StudyQuery {
    pub id: Option<String>,
}

impl StudyQuery {
    pub fn validate(self) -> Result<i64, ApiError> {
        let mut violations = Violations::default();
        let raw = self.id.map(Value::String);
        let id = violations.study_key("id", raw.as_ref());
        violations.finish(id)
    }
}

/// POST /api/start-study body
#[derive(Debug, Deserialize)]
pub struct StartStudyRequest {
    pub prolificid: Option<String>,
    pub studyid: Option<String>,
    pub sessionid: Option<String>,
}

impl StartStudyRequest {
    pub fn validate(self) -> Result<ParticipantIds, ApiError> {
        let mut violations = Violations::default();
        let ids = violations.participant(
            &START_FIELDS,
            self.prolificid.as_deref(),
            self.studyid.as_deref(),
            self.sessionid.as_deref(),
        );
        violations.finish(ids)
    }
}

/// POST /api/attention-check body
#[derive(Debug, Deserialize)]
pub struct AttentionCheckRequest {
    pub prolific_userid: Option<String>,
    pub prolific_studyid: Option<String>,
    pub prolific_sessionid: Option<String>,
    pub studyid: Option<Value>,
    #[serde(rename = "failedAttentionCheck")]
    pub failed_attention_check: Option<Value>,
}

#[derive(Debug)]
pub struct ValidAttentionCheck {
    pub study_id: i64,
    pub ids: ParticipantIds,
    pub failed_attention_check: Option<Value>,
}

impl AttentionCheckRequest {
    pub fn validate(self) -> Result<ValidAttentionCheck, ApiError> {
        let mut violations = Violations::default();
        let ids = violations.participant(
            &OWNER_FIELDS,
            self.prolific_userid.as_deref(),
            self.prolific_studyid.as_deref(),
            self.prolific_sessionid.as_deref(),
        );
        let study_id = violations.study_key("studyid", self.studyid.as_ref());

        let valid = match (ids, study_id) {
            (Some(ids), Some(study_id)) => Some(ValidAttentionCheck {
                study_id,
                ids,
                failed_attention_check: self.failed_attention_check,
            }),
            _ => None,
        };
        violations.finish(valid)
    }
}

/// POST /api/finish-study body
///
/// Page maps are JSON objects keyed by page id.
#[derive(Debug, Deserialize)]
pub struct FinishStudyRequest {
    pub prolific_userid: Option<String>,
    pub prolific_studyid: Option<String>,
    pub prolific_sessionid: Option<String>,
    pub studyid: Option<Value>,
    pub global_actions: Option<Value>,
    #[serde(rename = "screenActions", default)]
    pub screen_actions: BTreeMap<i64, Value>,
    #[serde(rename = "studySelections", default)]
    pub study_selections: BTreeMap<i64, Value>,
    #[serde(rename = "juiceOptions", default)]
    pub juice_options: BTreeMap<i64, Value>,
    #[serde(rename = "juiceOtherReason", default)]
    pub juice_other_reason: BTreeMap<i64, Value>,
    #[serde(rename = "failedAttentionCheck")]
    pub failed_attention_check: Option<Value>,
    #[serde(rename = "skippedPages")]
    pub skipped_pages: Option<Vec<i64>>,
}

#[derive(Debug)]
pub struct ValidFinish {
    pub study_id: i64,
    pub ids: ParticipantIds,
    pub completion: Completion,
}

impl FinishStudyRequest {
    pub fn validate(self) -> Result<ValidFinish, ApiError> {
        let mut violations = Violations::default();
        let ids = violations.participant(
            &OWNER_FIELDS,
            self.prolific_userid.as_deref(),
            self.prolific_studyid.as_deref(),
            self.prolific_sessionid.as_deref(),
        );
        let study_id = violations.study_key("studyid", self.studyid.as_ref());

        let valid = match (ids, study_id) {
            (Some(ids), Some(study_id)) => Some(ValidFinish {
                study_id,
                ids,
                completion: Completion {
                    global_actions: self.global_actions,
                    failed_attention_check: self.failed_attention_check,
                    skipped_pages: self.skipped_pages.unwrap_or_default(),
                    screen_actions: self.screen_actions,
                    selections: self.study_selections,
                    juice_options: self.juice_options,
                    juice_other_reason: self.juice_other_reason,
                },
            }),
            _ => None,
        };
        violations.finish(valid)
    }
}
