//! Lead record types and the `capture_lead` tool contract.
//!
//! A lead is the structured outcome of a call: caller contact details plus the
//! requested job. The model produces it as a function call whose arguments are
//! a JSON-encoded string; [`LeadRecord::from_tool_arguments`] is the only way
//! one is constructed, so a record in hand always has its required fields.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use super::realtime::openai::ToolDef;
use super::telephony::truncate_raw;

/// Name of the function-call tool the model invokes to hand over a lead.
pub const LEAD_TOOL_NAME: &str = "capture_lead";

/// How urgent the job is from the caller's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Low => write!(f, "low"),
            Urgency::Medium => write!(f, "medium"),
            Urgency::High => write!(f, "high"),
        }
    }
}

/// One qualified service lead, captured at most once per call.
///
/// Immutable once parsed; ownership transfers to whichever delivery
/// collaborator consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    /// Caller full name
    pub name: String,
    /// Best contact phone number
    pub phone: String,
    /// Full address including street and town
    pub address: String,
    /// UK postcode
    pub postcode: String,
    /// Detailed description of the issue or work requested
    pub description: String,
    /// Short job type/category, e.g. "consumer unit upgrade"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    /// Caller-perceived urgency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    /// Company name for commercial callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// How the caller found the business
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_found: Option<String>,
    /// Email address if provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Errors from parsing `capture_lead` tool-call arguments.
#[derive(Debug, Error)]
pub enum LeadParseError {
    /// Arguments did not parse as the expected record shape
    #[error("capture_lead arguments did not parse: {source} (raw: {raw})")]
    Malformed {
        /// Truncated raw arguments string for logging
        raw: String,
        /// Underlying parse error
        source: serde_json::Error,
    },
}

impl LeadRecord {
    /// Parse a lead from the JSON-encoded arguments string of a tool call.
    pub fn from_tool_arguments(raw: &str) -> Result<Self, LeadParseError> {
        serde_json::from_str(raw).map_err(|source| LeadParseError::Malformed {
            raw: truncate_raw(raw),
            source,
        })
    }
}

/// Build the `capture_lead` function schema pushed in the session handshake.
pub fn lead_tool() -> ToolDef {
    ToolDef {
        tool_type: "function".to_string(),
        name: LEAD_TOOL_NAME.to_string(),
        description: Some("Capture a fully qualified service lead from the caller.".to_string()),
        parameters: Some(json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Caller full name"
                },
                "phone": {
                    "type": "string",
                    "description": "Best contact phone number"
                },
                "email": {
                    "type": "string",
                    "description": "Email address if provided"
                },
                "address": {
                    "type": "string",
                    "description": "Full address including street, town, etc."
                },
                "postcode": {
                    "type": "string",
                    "description": "UK postcode"
                },
                "job_type": {
                    "type": "string",
                    "description": "Short job type/category, e.g. 'consumer unit upgrade'"
                },
                "description": {
                    "type": "string",
                    "description": "Detailed description of the issue or work requested"
                },
                "urgency": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "How urgent the job is from the caller's perspective"
                },
                "company": {
                    "type": "string",
                    "description": "Company name for commercial callers"
                },
                "how_found": {
                    "type": "string",
                    "description": "How the caller found the business (Google, referral, etc.)"
                }
            },
            "required": ["name", "phone", "address", "postcode", "description"]
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let raw = r#"{
            "name": "Jane Smith",
            "phone": "07700 900123",
            "address": "1 High Street, Leeds",
            "postcode": "LS1 1AA",
            "job_type": "rewire",
            "description": "Full house rewire, 3 bed semi",
            "urgency": "high",
            "company": "Smith Ltd",
            "how_found": "Google",
            "email": "jane@example.com"
        }"#;

        let lead = LeadRecord::from_tool_arguments(raw).unwrap();
        assert_eq!(lead.name, "Jane Smith");
        assert_eq!(lead.postcode, "LS1 1AA");
        assert_eq!(lead.urgency, Some(Urgency::High));
        assert_eq!(lead.how_found.as_deref(), Some("Google"));
    }

    #[test]
    fn test_parse_minimal_record() {
        let raw = r#"{
            "name": "Bob",
            "phone": "0113 496 0000",
            "address": "2 Low Street",
            "postcode": "LS2 2BB",
            "description": "Socket sparking in kitchen"
        }"#;

        let lead = LeadRecord::from_tool_arguments(raw).unwrap();
        assert_eq!(lead.job_type, None);
        assert_eq!(lead.urgency, None);
        assert_eq!(lead.email, None);
    }

    #[test]
    fn test_parse_rejects_missing_required_field() {
        // No phone number.
        let raw = r#"{"name":"Bob","address":"2 Low Street","postcode":"LS2 2BB","description":"x"}"#;
        let err = LeadRecord::from_tool_arguments(raw).unwrap_err();
        assert!(matches!(err, LeadParseError::Malformed { .. }));
    }

    #[test]
    fn test_parse_rejects_unknown_urgency() {
        let raw = r#"{
            "name": "Bob",
            "phone": "0113 496 0000",
            "address": "2 Low Street",
            "postcode": "LS2 2BB",
            "description": "x",
            "urgency": "immediately"
        }"#;
        assert!(LeadRecord::from_tool_arguments(raw).is_err());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = LeadRecord::from_tool_arguments("{truncated").unwrap_err();
        match err {
            LeadParseError::Malformed { raw, .. } => assert_eq!(raw, "{truncated"),
        }
    }

    #[test]
    fn test_lead_tool_schema() {
        let tool = lead_tool();
        assert_eq!(tool.tool_type, "function");
        assert_eq!(tool.name, LEAD_TOOL_NAME);

        let params = tool.parameters.unwrap();
        let required: Vec<&str> = params["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(
            required,
            vec!["name", "phone", "address", "postcode", "description"]
        );
        assert_eq!(params["properties"]["urgency"]["enum"][1], "medium");
    }

    #[test]
    fn test_urgency_display() {
        assert_eq!(Urgency::Low.to_string(), "low");
        assert_eq!(Urgency::Medium.to_string(), "medium");
        assert_eq!(Urgency::High.to_string(), "high");
    }
}
