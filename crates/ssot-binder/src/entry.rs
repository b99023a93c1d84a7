use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use ssot_crypto::ContentHasher;
use ssot_types::{Digest, EntryType};

use crate::error::{FieldIssue, IssueKind};
use crate::fields::{Fields, ROOT_LOC};

/// Attestation payload: council signatures and the quorum rule they satisfy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CouncilAttestation {
    pub signatures: Vec<String>,
    pub quorum_rule: String,
}

/// Parentage and forks of an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Lineage {
    pub parent: Option<String>,
    pub forks: Vec<String>,
    pub immutable: bool,
}

/// Replay governance for an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplayRules {
    pub authorized: bool,
    pub conditions: Vec<String>,
    pub override_protocol: Option<String>,
}

/// One provenance record in the binder.
///
/// Entries are only built by [`RegistryEntry::parse`] and are immutable
/// afterwards. The leaf hash is computed once at parse time over every field
/// except `notes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    artifact_id: String,
    #[serde(rename = "type")]
    entry_type: EntryType,
    author: String,
    #[serde(serialize_with = "serialize_timestamp")]
    created_at: DateTime<Utc>,
    canonical_sha256: String,
    council_attestation: CouncilAttestation,
    lineage: Lineage,
    replay: ReplayRules,
    capsule_ref: Option<String>,
    notes: Option<String>,
    #[serde(skip)]
    leaf_hash: Digest,
}

impl RegistryEntry {
    /// Validate a JSON payload into an entry.
    ///
    /// Returns every field-level problem found, not just the first.
    pub fn parse(value: &Value) -> Result<Self, Vec<FieldIssue>> {
        Self::parse_at(value, Vec::new())
    }

    /// Like [`parse`](Self::parse), with issue locations prefixed by `prefix`.
    pub(crate) fn parse_at(value: &Value, prefix: Vec<String>) -> Result<Self, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let Some(fields) = Fields::open(value, prefix.clone(), &mut issues) else {
            return Err(issues);
        };

        let artifact_id = fields.required_str("artifact_id", &mut issues);
        if artifact_id.as_deref() == Some("") {
            issues.push(FieldIssue::new(
                fields.loc("artifact_id"),
                IssueKind::Empty,
                "artifact_id must not be empty",
            ));
        }
        let entry_type = parse_entry_type(&fields, &mut issues);
        let author = fields.required_str("author", &mut issues);
        let created_at = parse_created_at(&fields, &mut issues);
        let canonical_sha256 = fields.required_str("canonical_sha256", &mut issues);
        let council_attestation = fields
            .nested("council_attestation", &mut issues)
            .and_then(|f| parse_attestation(&f, &mut issues));
        let lineage = fields
            .nested("lineage", &mut issues)
            .and_then(|f| parse_lineage(&f, &mut issues));
        let replay = fields
            .nested("replay", &mut issues)
            .and_then(|f| parse_replay(&f, &mut issues));
        let capsule_ref = fields.optional_str("capsule_ref", &mut issues);
        let notes = fields.optional_str("notes", &mut issues);

        let (
            Some(artifact_id),
            Some(entry_type),
            Some(author),
            Some(created_at),
            Some(canonical_sha256),
            Some(council_attestation),
            Some(lineage),
            Some(replay),
            Some(capsule_ref),
            Some(notes),
        ) = (
            artifact_id,
            entry_type,
            author,
            created_at,
            canonical_sha256,
            council_attestation,
            lineage,
            replay,
            capsule_ref,
            notes,
        )
        else {
            return Err(issues);
        };
        if !issues.is_empty() {
            return Err(issues);
        }

        let mut entry = Self {
            artifact_id,
            entry_type,
            author,
            created_at,
            canonical_sha256,
            council_attestation,
            lineage,
            replay,
            capsule_ref,
            notes,
            leaf_hash: Digest::from_hash([0; 32]),
        };
        entry.leaf_hash = entry.compute_leaf_hash().map_err(|reason| {
            let mut loc = prefix;
            if loc.is_empty() {
                loc.push(ROOT_LOC.to_string());
            }
            vec![FieldIssue::new(loc, IssueKind::WrongType, reason)]
        })?;
        Ok(entry)
    }

    /// SHA-256 over the canonical encoding of every field except `notes`.
    fn compute_leaf_hash(&self) -> Result<Digest, String> {
        let mut payload = serde_json::to_value(self).map_err(|e| e.to_string())?;
        if let Value::Object(map) = &mut payload {
            map.remove("notes");
        }
        ContentHasher::hash_value(&payload).map_err(|e| e.to_string())
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Content hash of the artifact itself, computed outside the binder.
    pub fn canonical_sha256(&self) -> &str {
        &self.canonical_sha256
    }

    pub fn council_attestation(&self) -> &CouncilAttestation {
        &self.council_attestation
    }

    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    pub fn replay(&self) -> &ReplayRules {
        &self.replay
    }

    pub fn capsule_ref(&self) -> Option<&str> {
        self.capsule_ref.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Hash of this entry as a Merkle leaf.
    pub fn leaf_hash(&self) -> Digest {
        self.leaf_hash
    }

    /// Wire form of the entry, `notes` included.
    pub fn to_json(&self) -> Value {
        // Field types are strings, bools and lists of strings; this cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Render timestamps as UTC RFC 3339 with a `Z` suffix and minimal precision.
fn serialize_timestamp<S: Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// ISO-8601 forms with an explicit offset. A trailing `Z` is rewritten to
/// `+00:00` before these are tried.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

/// ISO-8601 forms without an offset, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts RFC 3339, basic (`+0200`) or extended (`+02:00`) offsets, times
/// without seconds, and bare dates (midnight). Values without an offset are
/// taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let zoned = match raw.strip_suffix(['Z', 'z']) {
        Some(stem) => format!("{stem}+00:00"),
        None => raw.to_string(),
    };
    let with_offset = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&zoned, fmt).ok())
        .map(|ts| ts.with_timezone(&Utc));
    if with_offset.is_some() {
        return with_offset;
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn parse_entry_type(fields: &Fields<'_>, issues: &mut Vec<FieldIssue>) -> Option<EntryType> {
    // `type` on the wire; `entry_type` accepted by field name.
    let key = if !fields.has("type") && fields.has("entry_type") {
        "entry_type"
    } else {
        "type"
    };
    let raw = fields.required_str(key, issues)?;
    match raw.parse::<EntryType>() {
        Ok(kind) => Some(kind),
        Err(_) => {
            let allowed: Vec<&str> = EntryType::ALL.iter().map(EntryType::as_str).collect();
            issues.push(FieldIssue::new(
                fields.loc(key),
                IssueKind::InvalidEntryType,
                format!(
                    "entry type '{raw}' is not part of the canonical binder; \
                     entry_type must be one of: {}",
                    allowed.join(", ")
                ),
            ));
            None
        }
    }
}

fn parse_created_at(
    fields: &Fields<'_>,
    issues: &mut Vec<FieldIssue>,
) -> Option<DateTime<Utc>> {
    let raw = fields.required_str("created_at", issues)?;
    let parsed = parse_timestamp(&raw);
    if parsed.is_none() {
        issues.push(FieldIssue::new(
            fields.loc("created_at"),
            IssueKind::InvalidTimestamp,
            format!("invalid datetime format: '{raw}'"),
        ));
    }
    parsed
}

fn parse_attestation(
    fields: &Fields<'_>,
    issues: &mut Vec<FieldIssue>,
) -> Option<CouncilAttestation> {
    let signatures = fields.str_list("signatures", issues);
    let quorum_rule = fields.required_str("quorum_rule", issues);
    Some(CouncilAttestation {
        signatures: signatures?,
        quorum_rule: quorum_rule?,
    })
}

fn parse_lineage(fields: &Fields<'_>, issues: &mut Vec<FieldIssue>) -> Option<Lineage> {
    let parent = fields.optional_str("parent", issues);
    let forks = fields.str_list("forks", issues);
    let immutable = fields.bool_or("immutable", true, issues);
    Some(Lineage {
        parent: parent?,
        forks: forks?,
        immutable: immutable?,
    })
}

fn parse_replay(fields: &Fields<'_>, issues: &mut Vec<FieldIssue>) -> Option<ReplayRules> {
    let authorized = fields.required_bool("authorized", issues);
    let conditions = fields.str_list("conditions", issues);
    let override_protocol = fields.optional_str("override_protocol", issues);
    Some(ReplayRules {
        authorized: authorized?,
        conditions: conditions?,
        override_protocol: override_protocol?,
    })
}
