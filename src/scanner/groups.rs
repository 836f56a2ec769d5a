use std::collections::BTreeMap;

/// Folder names the music library uses, and the group tag each one maps to.
const BUILTIN_GROUPS: &[(&str, &str)] = &[
    ("Crowd", "crowd"),
    ("Face-off", "faceoff"),
    ("Faceoff", "faceoff"),
    ("Goal", "goal"),
    ("Intro", "intro"),
    ("Penalty", "penalty"),
];

/// Group tag resolved for a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupTag {
    /// Folder name found in the lookup table.
    Mapped(String),
    /// Folder name not in the table; the tag is the lowercased folder name.
    Fallback(String),
}

impl GroupTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mapped(tag) | Self::Fallback(tag) => tag,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Mapped(tag) | Self::Fallback(tag) => tag,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Folder name → group tag lookup. Matching is exact (case-sensitive).
#[derive(Debug, Clone)]
pub struct GroupTable {
    mappings: BTreeMap<String, String>,
}

impl GroupTable {
    /// Only the built-in folder names.
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_GROUPS.iter().map(|(f, g)| (f.to_string(), g.to_string())))
    }

    /// Built-in table with `custom` entries added on top (custom wins).
    pub fn with_overrides(custom: &BTreeMap<String, String>) -> Self {
        let mut table = Self::builtin();
        for (folder, group) in custom {
            table.mappings.insert(folder.clone(), group.clone());
        }
        table
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            mappings: pairs.into_iter().collect(),
        }
    }

    pub fn resolve(&self, folder: &str) -> GroupTag {
        match self.mappings.get(folder) {
            Some(group) => GroupTag::Mapped(group.clone()),
            None => GroupTag::Fallback(folder.to_lowercase()),
        }
    }
}

impl Default for GroupTable {
    fn default() -> Self {
        Self::builtin()
    }
}
