use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Kind of artifact a registry entry describes.
///
/// The set is closed: an entry naming any other kind is not part of the
/// canonical binder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Script,
    Storyboard,
    Asset,
    Clip,
    Checkpoint,
}

impl EntryType {
    /// Every allowed kind, in declaration order.
    pub const ALL: [EntryType; 5] = [
        Self::Script,
        Self::Storyboard,
        Self::Asset,
        Self::Clip,
        Self::Checkpoint,
    ];

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Storyboard => "storyboard",
            Self::Asset => "asset",
            Self::Clip => "clip",
            Self::Checkpoint => "checkpoint",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TypeError::UnknownEntryType(s.to_string()))
    }
}
