use std::collections::HashMap;

use serde::{Serialize, Serializer};
use serde_json::Value;
use ssot_crypto::{MerkleProof, MerkleTree};
use ssot_types::Digest;
use tracing::{debug, info};

use crate::entry::RegistryEntry;
use crate::envelope::{RegistryContext, RegistryEnvelope};
use crate::error::{FieldIssue, IssueKind, LoadError};

/// An entry annotated with its own leaf hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot {
    #[serde(flatten)]
    pub entry: RegistryEntry,
    pub leaf_hash: Digest,
}

impl EntrySnapshot {
    fn of(entry: &RegistryEntry) -> Self {
        Self {
            entry: entry.clone(),
            leaf_hash: entry.leaf_hash(),
        }
    }
}

/// Full serializable view of a binder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BinderSnapshot {
    pub capsule_id: String,
    pub registry: RegistryContext,
    pub entries: Vec<EntrySnapshot>,
    /// Lowercase hex root, `""` when the binder is empty.
    pub merkle_root: String,
}

/// Inclusion proof for one registered entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryProof {
    pub artifact_id: String,
    pub index: usize,
    pub leaf_hash: Digest,
    pub proof: MerkleProof,
}

/// Why a candidate was not admitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidateRejection {
    /// The payload did not validate; fix the payload.
    Fields(Vec<FieldIssue>),
    /// The payload is well-formed but the id is taken.
    Duplicate { artifact_id: String },
}

impl CandidateRejection {
    /// Wire form: a list of issues. A duplicate is a single issue.
    pub fn issues(&self) -> Vec<FieldIssue> {
        match self {
            Self::Fields(issues) => issues.clone(),
            Self::Duplicate { .. } => vec![FieldIssue::new(
                vec!["artifact_id".into()],
                IssueKind::Duplicate,
                "artifact already registered",
            )],
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Result of validating a prospective entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidateOutcome {
    Valid {
        candidate: EntrySnapshot,
        /// Root the binder would have with the candidate's leaf appended.
        merkle_preview: String,
    },
    Invalid(CandidateRejection),
}

impl CandidateOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

#[derive(Serialize)]
struct CandidateReport<'a> {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<&'a EntrySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merkle_preview: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldIssue>>,
}

impl Serialize for CandidateOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let report = match self {
            Self::Valid {
                candidate,
                merkle_preview,
            } => CandidateReport {
                valid: true,
                candidate: Some(candidate),
                merkle_preview: Some(merkle_preview),
                errors: None,
            },
            Self::Invalid(rejection) => CandidateReport {
                valid: false,
                candidate: None,
                merkle_preview: None,
                errors: Some(rejection.issues()),
            },
        };
        report.serialize(serializer)
    }
}

/// The single authority over the provenance registry and its Merkle root.
///
/// A binder is frozen at construction. Every query takes `&self` and works
/// on local copies, so a binder can be shared across threads without locks.
/// Admitting an entry produces a new binder; see [`SsotBinder::admit`].
#[derive(Clone, Debug)]
pub struct SsotBinder {
    envelope: RegistryEnvelope,
    index: HashMap<String, usize>,
    tree: MerkleTree,
}

impl SsotBinder {
    /// Build a binder over a validated envelope.
    ///
    /// Fails if two entries share an `artifact_id`.
    pub fn new(envelope: RegistryEnvelope) -> Result<Self, LoadError> {
        let mut index = HashMap::with_capacity(envelope.entries().len());
        for (i, entry) in envelope.entries().iter().enumerate() {
            if index.insert(entry.artifact_id().to_string(), i).is_some() {
                return Err(LoadError::DuplicateArtifact {
                    artifact_id: entry.artifact_id().to_string(),
                });
            }
        }
        let tree = MerkleTree::from_leaves(
            envelope.entries().iter().map(RegistryEntry::leaf_hash).collect(),
        );

        info!(
            capsule = envelope.capsule_id(),
            entries = envelope.entries().len(),
            root = %tree.root_hex(),
            "binder sealed"
        );

        Ok(Self {
            envelope,
            index,
            tree,
        })
    }

    /// Validate a JSON document and build a binder from it.
    pub fn from_value(value: &Value) -> Result<Self, LoadError> {
        let envelope =
            RegistryEnvelope::parse(value).map_err(|issues| LoadError::Envelope { issues })?;
        Self::new(envelope)
    }

    pub fn capsule_id(&self) -> &str {
        self.envelope.capsule_id()
    }

    pub fn registry(&self) -> &RegistryContext {
        self.envelope.registry()
    }

    /// Entries in canonical `artifact_id` order.
    pub fn entries(&self) -> &[RegistryEntry] {
        self.envelope.entries()
    }

    /// Artifact ids in canonical order.
    pub fn entry_ids(&self) -> Vec<&str> {
        self.entries().iter().map(RegistryEntry::artifact_id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Leaf hashes in tree order.
    pub fn leaf_hashes(&self) -> &[Digest] {
        self.tree.leaves()
    }

    /// Current Merkle root as lowercase hex, `""` when empty.
    pub fn merkle_root(&self) -> String {
        self.tree.root_hex()
    }

    /// Look up an entry. A miss is a normal outcome.
    pub fn get_entry(&self, artifact_id: &str) -> Option<&RegistryEntry> {
        self.index.get(artifact_id).map(|&i| &self.entries()[i])
    }

    /// Full snapshot: capsule, registry context, entries with leaf hashes, root.
    pub fn snapshot(&self) -> BinderSnapshot {
        BinderSnapshot {
            capsule_id: self.capsule_id().to_string(),
            registry: self.registry().clone(),
            entries: self.entries().iter().map(EntrySnapshot::of).collect(),
            merkle_root: self.merkle_root(),
        }
    }

    /// The snapshot rendered as JSON.
    pub fn as_dict(&self) -> Value {
        serde_json::to_value(self.snapshot()).unwrap_or(Value::Null)
    }

    /// Inclusion proof for a registered entry.
    pub fn prove(&self, artifact_id: &str) -> Option<EntryProof> {
        let index = *self.index.get(artifact_id)?;
        let proof = self.tree.proof(index)?;
        Some(EntryProof {
            artifact_id: artifact_id.to_string(),
            index,
            leaf_hash: proof.leaf,
            proof,
        })
    }

    /// Validate a prospective entry and preview the root it would produce.
    ///
    /// Never touches the binder's entries, index, or tree.
    pub fn validate_candidate(&self, candidate: &Value) -> CandidateOutcome {
        match self.check_candidate(candidate) {
            Ok(entry) => {
                let mut leaves = self.tree.leaves().to_vec();
                leaves.push(entry.leaf_hash());
                let merkle_preview = MerkleTree::from_leaves(leaves).root_hex();
                debug!(
                    artifact_id = entry.artifact_id(),
                    preview = %merkle_preview,
                    "candidate accepted for preview"
                );
                CandidateOutcome::Valid {
                    candidate: EntrySnapshot::of(&entry),
                    merkle_preview,
                }
            }
            Err(rejection) => CandidateOutcome::Invalid(rejection),
        }
    }

    /// Build a new binder holding this binder's entries plus the candidate.
    ///
    /// `self` is unchanged; callers swap the returned binder in.
    pub fn admit(&self, candidate: &Value) -> Result<SsotBinder, CandidateRejection> {
        let entry = self.check_candidate(candidate)?;
        let envelope = self.envelope.with_entry(entry);
        Self::new(envelope).map_err(|_| CandidateRejection::Duplicate {
            artifact_id: candidate_id(candidate),
        })
    }

    /// Copy of the backing envelope, for persisting.
    pub fn to_envelope(&self) -> RegistryEnvelope {
        self.envelope.clone()
    }

    fn check_candidate(&self, candidate: &Value) -> Result<RegistryEntry, CandidateRejection> {
        let entry = RegistryEntry::parse(candidate).map_err(|issues| {
            debug!(issues = issues.len(), "candidate failed validation");
            CandidateRejection::Fields(issues)
        })?;
        if self.index.contains_key(entry.artifact_id()) {
            debug!(artifact_id = entry.artifact_id(), "candidate duplicates a registered artifact");
            return Err(CandidateRejection::Duplicate {
                artifact_id: entry.artifact_id().to_string(),
            });
        }
        Ok(entry)
    }
}

fn candidate_id(candidate: &Value) -> String {
    candidate
        .get("artifact_id")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::entry::tests::payload;

    fn envelope(entries: Vec<Value>) -> Value {
        json!({
            "capsule_id": "capsule.ssot.registry.v1",
            "registry": {"name": "SSOT Binder", "version": "1.0.0", "maintainer": "archive-council"},
            "entries": entries,
        })
    }

    fn binder(ids: &[(&str, &str)]) -> SsotBinder {
        let entries = ids.iter().map(|(id, kind)| payload(id, kind)).collect();
        SsotBinder::from_value(&envelope(entries)).unwrap()
    }

    fn leaf(id: &str, kind: &str) -> Digest {
        RegistryEntry::parse(&payload(id, kind)).unwrap().leaf_hash()
    }

    #[test]
    fn entries_follow_artifact_order_not_input_order() {
        let b = binder(&[("b", "asset"), ("a", "script")]);
        assert_eq!(b.entry_ids(), vec!["a", "b"]);
        let forward = binder(&[("a", "script"), ("b", "asset")]);
        assert_eq!(b.merkle_root(), forward.merkle_root());
    }

    #[test]
    fn root_is_tree_over_sorted_leaf_hashes() {
        let b = binder(&[("b", "asset"), ("a", "script")]);
        let expected = MerkleTree::from_leaves(vec![leaf("a", "script"), leaf("b", "asset")]);
        assert_eq!(b.merkle_root(), expected.root_hex());
        assert_eq!(b.leaf_hashes(), expected.leaves());
    }

    #[test]
    fn empty_binder_has_empty_root() {
        let b = binder(&[]);
        assert!(b.is_empty());
        assert_eq!(b.merkle_root(), "");
        assert_eq!(b.as_dict()["merkle_root"], "");
    }

    #[test]
    fn get_entry_hit_and_miss() {
        let b = binder(&[("a", "script")]);
        assert_eq!(b.get_entry("a").unwrap().artifact_id(), "a");
        assert!(b.get_entry("missing").is_none());
    }

    #[test]
    fn duplicate_ids_in_envelope_fail_to_load() {
        let value = envelope(vec![payload("a", "script"), payload("a", "clip")]);
        let err = SsotBinder::from_value(&value).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateArtifact { artifact_id } if artifact_id == "a"));
    }

    #[test]
    fn invalid_envelope_fails_to_load() {
        let value = envelope(vec![payload("a", "movie")]);
        assert!(matches!(
            SsotBinder::from_value(&value),
            Err(LoadError::Envelope { .. })
        ));
    }

    #[test]
    fn as_dict_shape() {
        let b = binder(&[("a", "script")]);
        let dict = b.as_dict();
        assert_eq!(dict["capsule_id"], "capsule.ssot.registry.v1");
        assert_eq!(dict["registry"]["name"], "SSOT Binder");
        assert_eq!(dict["entries"][0]["artifact_id"], "a");
        assert_eq!(dict["entries"][0]["type"], "script");
        assert_eq!(dict["entries"][0]["leaf_hash"], leaf("a", "script").to_hex());
        assert_eq!(dict["entries"][0]["notes"], "first cut");
        assert_eq!(dict["merkle_root"], leaf("a", "script").to_hex());
    }

    #[test]
    fn preview_appends_candidate_leaf() {
        let b = binder(&[("a", "script"), ("b", "asset")]);
        let outcome = b.validate_candidate(&payload("c", "clip"));
        let expected = MerkleTree::from_leaves(vec![
            leaf("a", "script"),
            leaf("b", "asset"),
            leaf("c", "clip"),
        ]);
        match outcome {
            CandidateOutcome::Valid {
                candidate,
                merkle_preview,
            } => {
                assert_eq!(merkle_preview, expected.root_hex());
                assert_eq!(candidate.leaf_hash, leaf("c", "clip"));
                assert_eq!(candidate.entry.artifact_id(), "c");
            }
            CandidateOutcome::Invalid(r) => panic!("unexpected rejection: {r:?}"),
        }
    }

    #[test]
    fn preview_on_empty_binder_is_candidate_leaf() {
        let b = binder(&[]);
        let CandidateOutcome::Valid { candidate, merkle_preview } =
            b.validate_candidate(&payload("solo", "checkpoint"))
        else {
            panic!("candidate should be valid");
        };
        assert_eq!(merkle_preview, candidate.leaf_hash.to_hex());
        assert_eq!(candidate.leaf_hash, leaf("solo", "checkpoint"));
        assert_eq!(b.merkle_root(), "");
    }

    #[test]
    fn preview_appends_even_when_id_sorts_first() {
        let b = binder(&[("b", "asset"), ("c", "clip")]);
        let outcome = b.validate_candidate(&payload("a", "script"));
        let CandidateOutcome::Valid { merkle_preview, .. } = outcome else {
            panic!("candidate should be valid");
        };
        let appended = MerkleTree::from_leaves(vec![
            leaf("b", "asset"),
            leaf("c", "clip"),
            leaf("a", "script"),
        ]);
        assert_eq!(merkle_preview, appended.root_hex());
    }

    #[test]
    fn validate_candidate_never_mutates() {
        let b = binder(&[("a", "script"), ("b", "asset")]);
        let before = b.as_dict();
        let first = b.validate_candidate(&payload("c", "clip"));
        let second = b.validate_candidate(&payload("c", "clip"));
        b.validate_candidate(&payload("a", "script"));
        b.validate_candidate(&payload("d", "movie"));
        assert_eq!(first, second);
        assert_eq!(b.as_dict(), before);
        assert_eq!(b.len(), 2);
        assert!(b.get_entry("c").is_none());
    }

    #[test]
    fn duplicate_candidate_is_rejected_distinctly() {
        let b = binder(&[("a", "script")]);
        let outcome = b.validate_candidate(&payload("a", "clip"));
        let CandidateOutcome::Invalid(rejection) = &outcome else {
            panic!("duplicate should be rejected");
        };
        assert!(rejection.is_duplicate());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0]["loc"], json!(["artifact_id"]));
        assert_eq!(json["errors"][0]["msg"], "artifact already registered");
        assert_eq!(json["errors"][0]["type"], "value_error.duplicate");
        assert!(json.get("candidate").is_none());
    }

    #[test]
    fn malformed_candidate_with_taken_id_reports_fields_not_duplicate() {
        let b = binder(&[("a", "script")]);
        let outcome = b.validate_candidate(&payload("a", "movie"));
        let CandidateOutcome::Invalid(CandidateRejection::Fields(issues)) = outcome else {
            panic!("expected field issues");
        };
        assert_eq!(issues[0].kind, IssueKind::InvalidEntryType);
    }

    #[test]
    fn invalid_entry_type_candidate_names_the_field() {
        let b = binder(&[]);
        let json = serde_json::to_value(b.validate_candidate(&payload("x", "movie"))).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0]["loc"], json!(["type"]));
        assert!(json["errors"][0]["msg"].as_str().unwrap().contains("entry_type"));
    }

    #[test]
    fn valid_outcome_serializes_candidate_and_preview() {
        let b = binder(&[("a", "script")]);
        let json = serde_json::to_value(b.validate_candidate(&payload("b", "asset"))).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["candidate"]["artifact_id"], "b");
        assert_eq!(json["candidate"]["leaf_hash"], leaf("b", "asset").to_hex());
        assert_eq!(json["merkle_preview"].as_str().unwrap().len(), 64);
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn admit_builds_new_binder_and_leaves_receiver() {
        let b = binder(&[("a", "script"), ("c", "clip")]);
        let before = b.as_dict();
        let next = b.admit(&payload("b", "asset")).unwrap();
        assert_eq!(next.entry_ids(), vec!["a", "b", "c"]);
        let expected = MerkleTree::from_leaves(vec![
            leaf("a", "script"),
            leaf("b", "asset"),
            leaf("c", "clip"),
        ]);
        assert_eq!(next.merkle_root(), expected.root_hex());
        assert_eq!(b.as_dict(), before);
    }

    #[test]
    fn admit_rejects_duplicates() {
        let b = binder(&[("a", "script")]);
        let err = b.admit(&payload("a", "asset")).unwrap_err();
        assert_eq!(err, CandidateRejection::Duplicate { artifact_id: "a".into() });
    }

    #[test]
    fn prove_returns_verifiable_proofs() {
        let b = binder(&[("a", "script"), ("b", "asset"), ("c", "clip")]);
        for id in ["a", "b", "c"] {
            let proof = b.prove(id).unwrap();
            assert_eq!(proof.leaf_hash, b.get_entry(id).unwrap().leaf_hash());
            assert!(proof.proof.verify());
            assert_eq!(proof.proof.root.to_hex(), b.merkle_root());
        }
        assert!(b.prove("zzz").is_none());
    }

    #[test]
    fn binder_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SsotBinder>();
    }
}
