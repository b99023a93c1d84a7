use serde_json::{Map, Value};

use crate::error::{FieldIssue, IssueKind};

/// Root location used when the payload itself has the wrong shape.
pub(crate) const ROOT_LOC: &str = "__root__";

/// Typed reader over one JSON object.
///
/// Every accessor records a [`FieldIssue`] and returns `None` when the field
/// cannot be read, so callers can keep going and report every problem at
/// once. Keys the reader is never asked about are ignored. Strings are
/// trimmed.
pub(crate) struct Fields<'a> {
    map: &'a Map<String, Value>,
    prefix: Vec<String>,
}

impl<'a> Fields<'a> {
    /// Open `value` as an object located at `prefix`.
    pub(crate) fn open(
        value: &'a Value,
        prefix: Vec<String>,
        issues: &mut Vec<FieldIssue>,
    ) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self { map, prefix }),
            _ => {
                let loc = if prefix.is_empty() {
                    vec![ROOT_LOC.to_string()]
                } else {
                    prefix
                };
                issues.push(FieldIssue::new(
                    loc,
                    IssueKind::WrongType,
                    "value is not a valid dict",
                ));
                None
            }
        }
    }

    pub(crate) fn loc(&self, key: &str) -> Vec<String> {
        let mut loc = self.prefix.clone();
        loc.push(key.to_string());
        loc
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Whether `key` holds a non-null value.
    pub(crate) fn has(&self, key: &str) -> bool {
        self.present(key).is_some()
    }

    fn missing(&self, key: &str, issues: &mut Vec<FieldIssue>) {
        issues.push(FieldIssue::new(self.loc(key), IssueKind::Missing, "field required"));
    }

    fn as_string(&self, key: &str, value: &Value, issues: &mut Vec<FieldIssue>) -> Option<String> {
        match value {
            Value::String(s) => Some(s.trim().to_string()),
            _ => {
                issues.push(FieldIssue::new(
                    self.loc(key),
                    IssueKind::WrongType,
                    "str type expected",
                ));
                None
            }
        }
    }

    pub(crate) fn required_str(&self, key: &str, issues: &mut Vec<FieldIssue>) -> Option<String> {
        match self.present(key) {
            Some(value) => self.as_string(key, value, issues),
            None => {
                self.missing(key, issues);
                None
            }
        }
    }

    /// `Some(None)` when absent or `null`; `None` only when an issue was recorded.
    pub(crate) fn optional_str(
        &self,
        key: &str,
        issues: &mut Vec<FieldIssue>,
    ) -> Option<Option<String>> {
        match self.present(key) {
            Some(value) => self.as_string(key, value, issues).map(Some),
            None => Some(None),
        }
    }

    fn as_bool(&self, key: &str, value: &Value, issues: &mut Vec<FieldIssue>) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => {
                issues.push(FieldIssue::new(
                    self.loc(key),
                    IssueKind::WrongType,
                    "value could not be parsed to a boolean",
                ));
                None
            }
        }
    }

    pub(crate) fn required_bool(&self, key: &str, issues: &mut Vec<FieldIssue>) -> Option<bool> {
        match self.present(key) {
            Some(value) => self.as_bool(key, value, issues),
            None => {
                self.missing(key, issues);
                None
            }
        }
    }

    pub(crate) fn bool_or(
        &self,
        key: &str,
        default: bool,
        issues: &mut Vec<FieldIssue>,
    ) -> Option<bool> {
        match self.present(key) {
            Some(value) => self.as_bool(key, value, issues),
            None => Some(default),
        }
    }

    /// A list of strings, defaulting to empty when absent.
    pub(crate) fn str_list(&self, key: &str, issues: &mut Vec<FieldIssue>) -> Option<Vec<String>> {
        let Some(value) = self.present(key) else {
            return Some(Vec::new());
        };
        let Value::Array(items) = value else {
            issues.push(FieldIssue::new(
                self.loc(key),
                IssueKind::WrongType,
                "value is not a valid list",
            ));
            return None;
        };

        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => out.push(s.trim().to_string()),
                _ => {
                    let mut loc = self.loc(key);
                    loc.push(i.to_string());
                    issues.push(FieldIssue::new(loc, IssueKind::WrongType, "str type expected"));
                    ok = false;
                }
            }
        }
        ok.then_some(out)
    }

    /// A required array, returned raw for the caller to walk.
    pub(crate) fn required_list(
        &self,
        key: &str,
        issues: &mut Vec<FieldIssue>,
    ) -> Option<&'a Vec<Value>> {
        match self.present(key) {
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                issues.push(FieldIssue::new(
                    self.loc(key),
                    IssueKind::WrongType,
                    "value is not a valid list",
                ));
                None
            }
            None => {
                self.missing(key, issues);
                None
            }
        }
    }

    /// A required nested object.
    pub(crate) fn nested(&self, key: &str, issues: &mut Vec<FieldIssue>) -> Option<Fields<'a>> {
        match self.present(key) {
            Some(value) => Fields::open(value, self.loc(key), issues),
            None => {
                self.missing(key, issues);
                None
            }
        }
    }
}
