//! Submission and correction records

use serde::{Deserialize, Serialize};

use crate::form::Response;

/// Response bound to a form, immutable once persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Form URI
    pub form: String,
    pub response: Response,
}

/// Partial override of a submission's response
///
/// Corrections are append-only and never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    /// Form URI
    pub form: String,
    /// Submission URI
    pub submission: String,
    /// Version of the submission this correction supersedes
    pub submission_version: u32,
    pub response: Response,
    pub author: String,
}

/// Correction as supplied by an administrator
///
/// Version and author come from the request context, not the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    pub form: String,
    pub submission: String,
    pub response: Response,
}

impl CorrectionRequest {
    /// Attach the accepted version and author
    pub fn into_correction(self, submission_version: u32, author: impl Into<String>) -> Correction {
        Correction {
            form: self.form,
            submission: self.submission,
            submission_version,
            response: self.response,
            author: author.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_correction_wire_format() {
        let correction = CorrectionRequest {
            form: "https://example.com/form/f1".to_string(),
            submission: "https://example.com/assessment/s1".to_string(),
            response: Response::new(),
        }
        .into_correction(2, "admin@example.com");

        let value = serde_json::to_value(&correction).unwrap();
        assert_eq!(value["submissionVersion"], 2);
        assert_eq!(value["author"], "admin@example.com");
        assert_eq!(value["submission"], "https://example.com/assessment/s1");
    }

    #[test]
    fn test_submission_deserializes() {
        let submission: Submission = serde_json::from_value(json!({
            "form": "https://example.com/form/f1",
            "response": { "basicInfo": { "email": "alex@example.com" } }
        }))
        .unwrap();
        assert!(submission.response.answer("basicInfo", "email").is_some());
    }
}
