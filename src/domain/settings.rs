use crate::domain::{
    filtering::FilterMode,
    sorting::{SortField, SortOrder},
};
use serde::{Deserialize, Serialize};

/// Schema version written by this build
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Version assumed for stored settings that predate the version field
const LEGACY_VERSION: &str = "0.0.0";

/// User-facing configuration.
///
/// Every field carries a serde default, so a partial stored record always
/// deserializes into a complete settings object merged onto the defaults.
/// A stored record without a `version` reads as legacy `0.0.0`, which is
/// what gates migration; a freshly constructed `Settings` carries the
/// current [`SCHEMA_VERSION`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "legacy_version")]
    pub version: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub sort_field: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub default_filter: FilterMode,
    #[serde(default = "default_true")]
    pub confirm_delete: bool,
    #[serde(default = "default_true")]
    pub show_completed: bool,
}

fn legacy_version() -> String {
    LEGACY_VERSION.to_string()
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            theme: default_theme(),
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            default_filter: FilterMode::default(),
            confirm_delete: true,
            show_completed: true,
        }
    }
}

impl Settings {
    /// Checks whether the recorded schema version predates the 1.0.0 boundary
    pub fn predates_v1(&self) -> bool {
        version_lt(&self.version, "1.0.0")
    }

    /// Checks whether migration needs to run for this stored record
    pub fn needs_migration(&self) -> bool {
        self.version != SCHEMA_VERSION
    }
}

/// Compares dotted version strings numerically, missing segments as zero
fn version_lt(a: &str, b: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|seg| seg.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    for i in 0..a.len().max(b.len()) {
        let (x, y) = (
            a.get(i).copied().unwrap_or(0),
            b.get(i).copied().unwrap_or(0),
        );
        if x != y {
            return x < y;
        }
    }
    false
}
