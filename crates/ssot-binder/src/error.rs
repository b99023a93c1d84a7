use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Kind of a field-level validation problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// A required key is absent or `null`.
    Missing,
    /// The value has the wrong JSON shape.
    WrongType,
    /// `type` is not one of the allowed entry kinds.
    InvalidEntryType,
    /// `created_at` is not an ISO-8601 timestamp.
    InvalidTimestamp,
    /// A key field is empty after trimming.
    Empty,
    /// The artifact id is already registered in the binder.
    Duplicate,
}

impl IssueKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "value_error.missing",
            Self::WrongType => "type_error",
            Self::InvalidEntryType => "value_error.entry_type",
            Self::InvalidTimestamp => "value_error.datetime",
            Self::Empty => "value_error.empty",
            Self::Duplicate => "value_error.duplicate",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IssueKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One field-level problem, located by its path from the payload root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
}

impl FieldIssue {
    pub fn new(loc: Vec<String>, kind: IssueKind, msg: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind,
        }
    }

    /// Dotted rendering of `loc`, e.g. `lineage.forks.1`.
    pub fn path(&self) -> String {
        self.loc.join(".")
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.path(), self.msg, self.kind)
    }
}

/// Errors that abort loading a binder.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to access registry at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("registry at {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("registry envelope failed validation: {}", render_issues(.issues))]
    Envelope { issues: Vec<FieldIssue> },

    #[error("artifact '{artifact_id}' appears more than once in the registry")]
    DuplicateArtifact { artifact_id: String },

    #[error("binder handle has no registry path to load from")]
    NoSource,
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_serializes_with_type_key() {
        let issue = FieldIssue::new(
            vec!["lineage".into(), "forks".into()],
            IssueKind::WrongType,
            "value is not a valid list",
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["loc"], serde_json::json!(["lineage", "forks"]));
        assert_eq!(json["type"], "type_error");
        assert_eq!(json["msg"], "value is not a valid list");
    }

    #[test]
    fn issue_display_uses_dotted_path() {
        let issue = FieldIssue::new(
            vec!["a".into(), "0".into()],
            IssueKind::Missing,
            "field required",
        );
        assert_eq!(issue.to_string(), "a.0: field required (value_error.missing)");
    }

    #[test]
    fn envelope_error_lists_every_issue() {
        let err = LoadError::Envelope {
            issues: vec![
                FieldIssue::new(vec!["capsule_id".into()], IssueKind::Missing, "field required"),
                FieldIssue::new(
                    vec!["entries".into()],
                    IssueKind::WrongType,
                    "value is not a valid list",
                ),
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("capsule_id"));
        assert!(rendered.contains("entries"));
    }
}
