//! Import target registry.
//!
//! The catalog is static: it is built from constants and never mutated, so
//! the validator and committer can resolve columns and identity rules
//! without coordination.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Columns that belong to persisted records but are never imported.
///
/// They are recognised (so they do not show up as unknown columns) and
/// ignored with a recommendation.
pub const SYSTEM_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

/// One importable entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Suppliers,
    Plants,
    Products,
    Clients,
    Users,
}

impl TargetKind {
    /// Every kind, in registry order.
    pub const ALL: [TargetKind; 5] = [
        Self::Suppliers,
        Self::Plants,
        Self::Products,
        Self::Clients,
        Self::Users,
    ];

    /// Stable type id matching serde's `rename_all = "snake_case"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suppliers => "suppliers",
            Self::Plants => "plants",
            Self::Products => "products",
            Self::Clients => "clients",
            Self::Users => "users",
        }
    }

    /// Parse a type id. Returns `None` for unknown values.
    pub fn parse(type_id: &str) -> Option<Self> {
        let type_id = type_id.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == type_id)
    }

    /// Singular noun used in row-level messages.
    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::Suppliers => "supplier",
            Self::Plants => "plant",
            Self::Products => "product",
            Self::Clients => "client",
            Self::Users => "user",
        }
    }

    /// The registry entry for this kind.
    pub fn target(&self) -> &'static ImportTarget {
        match self {
            Self::Suppliers => &SUPPLIERS,
            Self::Plants => &PLANTS,
            Self::Products => &PRODUCTS,
            Self::Clients => &CLIENTS,
            Self::Users => &USERS,
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema and identity rule for one importable entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportTarget {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub label: &'static str,
    /// Columns that must appear in the header row, in canonical order.
    pub required_columns: &'static [&'static str],
    /// Columns that are understood when present.
    pub optional_columns: &'static [&'static str],
    /// Columns whose (normalized) values identify an existing record.
    pub identity_columns: &'static [&'static str],
}

impl ImportTarget {
    /// Whether `column` is part of this target's schema.
    pub fn knows_column(&self, column: &str) -> bool {
        self.required_columns.contains(&column) || self.optional_columns.contains(&column)
    }

    /// Required columns followed by optional columns.
    pub fn all_columns(&self) -> impl Iterator<Item = &'static str> {
        self.required_columns
            .iter()
            .chain(self.optional_columns.iter())
            .copied()
    }
}

static SUPPLIERS: ImportTarget = ImportTarget {
    kind: TargetKind::Suppliers,
    label: "Suppliers",
    required_columns: &["name"],
    optional_columns: &[
        "contact_person",
        "email",
        "phone",
        "address",
        "city",
        "postal_code",
        "website",
        "notes",
    ],
    identity_columns: &["name"],
};

static PLANTS: ImportTarget = ImportTarget {
    kind: TargetKind::Plants,
    label: "Plants",
    required_columns: &["name", "latin_name", "supplier_id", "price"],
    optional_columns: &[
        "height_cm",
        "pot_size",
        "hardiness_zone",
        "stock_quantity",
        "notes",
    ],
    identity_columns: &["name", "supplier_id"],
};

static PRODUCTS: ImportTarget = ImportTarget {
    kind: TargetKind::Products,
    label: "Products",
    required_columns: &["name", "price"],
    optional_columns: &[
        "sku",
        "category",
        "unit",
        "description",
        "supplier_id",
        "stock_quantity",
    ],
    identity_columns: &["name"],
};

static CLIENTS: ImportTarget = ImportTarget {
    kind: TargetKind::Clients,
    label: "Clients",
    required_columns: &["name", "email"],
    optional_columns: &[
        "phone",
        "company",
        "address",
        "city",
        "postal_code",
        "notes",
    ],
    identity_columns: &["email"],
};

static USERS: ImportTarget = ImportTarget {
    kind: TargetKind::Users,
    label: "Users",
    required_columns: &["username", "email"],
    optional_columns: &["password", "first_name", "last_name", "role"],
    identity_columns: &["username"],
};

/// All registered import targets, in registry order.
pub fn list_targets() -> Vec<&'static ImportTarget> {
    TargetKind::ALL.iter().map(TargetKind::target).collect()
}

/// Resolve a type id to its registry entry.
pub fn get_target(type_id: &str) -> Result<&'static ImportTarget, CoreError> {
    TargetKind::parse(type_id)
        .map(|kind| kind.target())
        .ok_or_else(|| CoreError::NotFound {
            entity: "Import target",
            key: type_id.to_string(),
        })
}
