use serde::Serialize;
use serde_json::Value;

use crate::entry::RegistryEntry;
use crate::error::FieldIssue;
use crate::fields::Fields;

/// Metadata describing the registry capsule itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryContext {
    pub name: String,
    pub version: String,
    pub maintainer: String,
}

/// Top-level persisted container: registry metadata plus its entries.
///
/// Entries are always held sorted by `artifact_id`. That order, not the
/// order in the source file, fixes the Merkle leaf order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryEnvelope {
    capsule_id: String,
    registry: RegistryContext,
    entries: Vec<RegistryEntry>,
}

impl RegistryEnvelope {
    pub fn new(
        capsule_id: String,
        registry: RegistryContext,
        mut entries: Vec<RegistryEntry>,
    ) -> Self {
        entries.sort_by(|a, b| a.artifact_id().cmp(b.artifact_id()));
        Self {
            capsule_id,
            registry,
            entries,
        }
    }

    /// Validate a parsed JSON document into an envelope.
    ///
    /// Entry issues are located under `entries.<index>`.
    pub fn parse(value: &Value) -> Result<Self, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let Some(fields) = Fields::open(value, Vec::new(), &mut issues) else {
            return Err(issues);
        };

        let capsule_id = fields.required_str("capsule_id", &mut issues);
        let registry = fields
            .nested("registry", &mut issues)
            .and_then(|f| parse_context(&f, &mut issues));

        let mut entries = Vec::new();
        if let Some(items) = fields.required_list("entries", &mut issues) {
            for (index, item) in items.iter().enumerate() {
                let prefix = vec!["entries".to_string(), index.to_string()];
                match RegistryEntry::parse_at(item, prefix) {
                    Ok(entry) => entries.push(entry),
                    Err(entry_issues) => issues.extend(entry_issues),
                }
            }
        }

        match (capsule_id, registry) {
            (Some(capsule_id), Some(registry)) if issues.is_empty() => {
                Ok(Self::new(capsule_id, registry, entries))
            }
            _ => Err(issues),
        }
    }

    pub fn capsule_id(&self) -> &str {
        &self.capsule_id
    }

    pub fn registry(&self) -> &RegistryContext {
        &self.registry
    }

    /// Entries in canonical `artifact_id` order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Copy of this envelope with `entry` added in canonical position.
    pub fn with_entry(&self, entry: RegistryEntry) -> Self {
        let mut entries = self.entries.clone();
        entries.push(entry);
        Self::new(self.capsule_id.clone(), self.registry.clone(), entries)
    }
}

fn parse_context(fields: &Fields<'_>, issues: &mut Vec<FieldIssue>) -> Option<RegistryContext> {
    let name = fields.required_str("name", issues);
    let version = fields.required_str("version", issues);
    let maintainer = fields.required_str("maintainer", issues);
    Some(RegistryContext {
        name: name?,
        version: version?,
        maintainer: maintainer?,
    })
}
