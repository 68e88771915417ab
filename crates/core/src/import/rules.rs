//! Per-target row rules.
//!
//! Each target kind converts a raw [`Row`] into a typed [`ImportRecord`] or
//! reports every field-level violation it finds. The validator and the
//! committer share these rules, so a file that validates is exactly a file
//! whose rows convert.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use validator::ValidateEmail;

use super::error::ImportError;
use super::file::Row;
use super::target::TargetKind;
use crate::credentials::{validate_password_strength, StoredCredentials, MIN_PASSWORD_LENGTH};
use crate::roles::parse_role;
use crate::types::DbId;

/// Maximum length of names, emails and other short text fields.
pub const MAX_SHORT_TEXT: usize = 200;

/// Maximum length of free-text fields (notes, descriptions, addresses).
pub const MAX_LONG_TEXT: usize = 2000;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,10})(?:[.,](\d{1,2}))?$").expect("valid regex"));

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,50}$").expect("valid regex"));

/// Normalize an identity value: trimmed and lowercased.
///
/// Identity matching is case-insensitive and ignores surrounding whitespace.
pub fn normalize_identity(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalized identity of a record within one target kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub kind: TargetKind,
    /// One normalized value per identity column, in column order.
    pub key: Vec<String>,
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key.join(" / "))
    }
}

// ── Typed records ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierRecord {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlantRecord {
    pub name: String,
    pub latin_name: Option<String>,
    pub supplier_id: DbId,
    pub price_cents: i64,
    pub height_cm: Option<i32>,
    pub pot_size: Option<String>,
    pub hardiness_zone: Option<String>,
    pub stock_quantity: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub name: String,
    pub price_cents: i64,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub supplier_id: Option<DbId>,
    pub stock_quantity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRecord {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Canonical role name; `None` keeps the stored role (or the default on create).
    pub role: Option<&'static str>,
    /// Plaintext password from the file. Never persisted or serialized.
    #[serde(skip)]
    pub password: Option<String>,
    /// Hashed credentials, filled in by the importer before writing.
    #[serde(skip)]
    pub credentials: Option<StoredCredentials>,
}

/// A row converted into the record type of its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum ImportRecord {
    Supplier(SupplierRecord),
    Plant(PlantRecord),
    Product(ProductRecord),
    Client(ClientRecord),
    User(UserRecord),
}

impl ImportRecord {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Supplier(_) => TargetKind::Suppliers,
            Self::Plant(_) => TargetKind::Plants,
            Self::Product(_) => TargetKind::Products,
            Self::Client(_) => TargetKind::Clients,
            Self::User(_) => TargetKind::Users,
        }
    }

    /// The normalized identity used to find an existing record.
    pub fn identity(&self) -> Identity {
        let key = match self {
            Self::Supplier(r) => vec![normalize_identity(&r.name)],
            Self::Plant(r) => vec![normalize_identity(&r.name), r.supplier_id.to_string()],
            Self::Product(r) => vec![normalize_identity(&r.name)],
            Self::Client(r) => vec![normalize_identity(&r.email)],
            Self::User(r) => vec![normalize_identity(&r.username)],
        };
        Identity {
            kind: self.kind(),
            key,
        }
    }

    /// Supplier this record points at, if any.
    pub fn referenced_supplier(&self) -> Option<DbId> {
        match self {
            Self::Plant(r) => Some(r.supplier_id),
            Self::Product(r) => r.supplier_id,
            _ => None,
        }
    }
}

// ── Row conversion ───────────────────────────────────────────────────

/// Convert one row into a record of `kind`.
///
/// `line` is the spreadsheet row number used in messages. On failure every
/// violation in the row is returned, not just the first. Required columns
/// absent from the header entirely are not reported per row; the validator
/// reports them once as missing columns.
pub fn parse_row(kind: TargetKind, row: &Row, line: usize) -> Result<ImportRecord, Vec<ImportError>> {
    let mut fields = FieldReader::new(row, line);
    let record = match kind {
        TargetKind::Suppliers => ImportRecord::Supplier(SupplierRecord {
            name: fields.required_text("name", MAX_SHORT_TEXT),
            contact_person: fields.optional_text("contact_person", MAX_SHORT_TEXT),
            email: fields.optional_email("email"),
            phone: fields.optional_text("phone", MAX_SHORT_TEXT),
            address: fields.optional_text("address", MAX_LONG_TEXT),
            city: fields.optional_text("city", MAX_SHORT_TEXT),
            postal_code: fields.optional_text("postal_code", MAX_SHORT_TEXT),
            website: fields.optional_text("website", MAX_SHORT_TEXT),
            notes: fields.optional_text("notes", MAX_LONG_TEXT),
        }),
        TargetKind::Plants => ImportRecord::Plant(PlantRecord {
            name: fields.required_text("name", MAX_SHORT_TEXT),
            latin_name: fields.optional_text("latin_name", MAX_SHORT_TEXT),
            supplier_id: fields.required_id("supplier_id"),
            price_cents: fields.required_price("price"),
            height_cm: fields.optional_count("height_cm"),
            pot_size: fields.optional_text("pot_size", MAX_SHORT_TEXT),
            hardiness_zone: fields.optional_text("hardiness_zone", MAX_SHORT_TEXT),
            stock_quantity: fields.optional_count("stock_quantity"),
            notes: fields.optional_text("notes", MAX_LONG_TEXT),
        }),
        TargetKind::Products => ImportRecord::Product(ProductRecord {
            name: fields.required_text("name", MAX_SHORT_TEXT),
            price_cents: fields.required_price("price"),
            sku: fields.optional_text("sku", MAX_SHORT_TEXT),
            category: fields.optional_text("category", MAX_SHORT_TEXT),
            unit: fields.optional_text("unit", MAX_SHORT_TEXT),
            description: fields.optional_text("description", MAX_LONG_TEXT),
            supplier_id: fields.optional_id("supplier_id"),
            stock_quantity: fields.optional_count("stock_quantity"),
        }),
        TargetKind::Clients => ImportRecord::Client(ClientRecord {
            name: fields.required_text("name", MAX_SHORT_TEXT),
            email: fields.required_email("email"),
            phone: fields.optional_text("phone", MAX_SHORT_TEXT),
            company: fields.optional_text("company", MAX_SHORT_TEXT),
            address: fields.optional_text("address", MAX_LONG_TEXT),
            city: fields.optional_text("city", MAX_SHORT_TEXT),
            postal_code: fields.optional_text("postal_code", MAX_SHORT_TEXT),
            notes: fields.optional_text("notes", MAX_LONG_TEXT),
        }),
        TargetKind::Users => ImportRecord::User(UserRecord {
            username: fields.required_username("username"),
            email: fields.required_email("email"),
            first_name: fields.optional_text("first_name", MAX_SHORT_TEXT),
            last_name: fields.optional_text("last_name", MAX_SHORT_TEXT),
            role: fields.optional_role("role"),
            password: fields.optional_password("password"),
            credentials: None,
        }),
    };
    fields.finish(record)
}

/// Reads typed values out of a row, collecting every violation.
struct FieldReader<'a> {
    row: &'a Row,
    line: usize,
    issues: Vec<ImportError>,
}

impl<'a> FieldReader<'a> {
    fn new(row: &'a Row, line: usize) -> Self {
        Self {
            row,
            line,
            issues: Vec::new(),
        }
    }

    fn finish(self, record: ImportRecord) -> Result<ImportRecord, Vec<ImportError>> {
        if self.issues.is_empty() {
            Ok(record)
        } else {
            Err(self.issues)
        }
    }

    fn issue(&mut self, message: String) {
        self.issues.push(ImportError::RowData {
            row: self.line,
            message,
        });
    }

    fn column_missing(&self, column: &str) -> bool {
        !self.row.contains_key(column)
    }

    /// Trimmed, non-empty cell value.
    fn raw(&self, column: &str) -> Option<&'a str> {
        self.row
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn optional_text(&mut self, column: &str, max_len: usize) -> Option<String> {
        let value = self.raw(column)?;
        if value.chars().count() > max_len {
            self.issue(format!("{column} must be at most {max_len} characters"));
            return None;
        }
        Some(value.to_string())
    }

    fn required_text(&mut self, column: &str, max_len: usize) -> String {
        if self.column_missing(column) {
            return String::new();
        }
        if self.raw(column).is_none() {
            self.issue(format!("{column} is required"));
            return String::new();
        }
        self.optional_text(column, max_len).unwrap_or_default()
    }

    fn optional_id(&mut self, column: &str) -> Option<DbId> {
        let value = self.raw(column)?;
        match parse_whole_number(value) {
            Some(id) if id > 0 => Some(id),
            _ => {
                self.issue(format!("{column} must be a positive whole number, got '{value}'"));
                None
            }
        }
    }

    fn required_id(&mut self, column: &str) -> DbId {
        if self.column_missing(column) {
            return 0;
        }
        if self.raw(column).is_none() {
            self.issue(format!("{column} is required"));
            return 0;
        }
        self.optional_id(column).unwrap_or_default()
    }

    fn optional_count(&mut self, column: &str) -> Option<i32> {
        let value = self.raw(column)?;
        match parse_whole_number(value).and_then(|n| i32::try_from(n).ok()) {
            Some(n) if n >= 0 => Some(n),
            _ => {
                self.issue(format!("{column} must be a non-negative whole number, got '{value}'"));
                None
            }
        }
    }

    fn required_price(&mut self, column: &str) -> i64 {
        if self.column_missing(column) {
            return 0;
        }
        let Some(value) = self.raw(column) else {
            self.issue(format!("{column} is required"));
            return 0;
        };
        match parse_price_cents(value) {
            Some(cents) => cents,
            None => {
                self.issue(format!(
                    "{column} must be a decimal amount with at most 2 decimals, got '{value}'"
                ));
                0
            }
        }
    }

    fn optional_email(&mut self, column: &str) -> Option<String> {
        let value = self.raw(column)?;
        if !value.validate_email() || value.len() > MAX_SHORT_TEXT {
            self.issue(format!("{column} '{value}' is not a valid email address"));
            return None;
        }
        Some(value.to_string())
    }

    fn required_email(&mut self, column: &str) -> String {
        if self.column_missing(column) {
            return String::new();
        }
        if self.raw(column).is_none() {
            self.issue(format!("{column} is required"));
            return String::new();
        }
        self.optional_email(column).unwrap_or_default()
    }

    fn required_username(&mut self, column: &str) -> String {
        if self.column_missing(column) {
            return String::new();
        }
        let Some(value) = self.raw(column) else {
            self.issue(format!("{column} is required"));
            return String::new();
        };
        if !USERNAME_RE.is_match(value) {
            self.issue(format!(
                "{column} '{value}' must be 3-50 letters, digits, '.', '_' or '-'"
            ));
        }
        value.to_string()
    }

    fn optional_role(&mut self, column: &str) -> Option<&'static str> {
        let value = self.raw(column)?;
        let role = parse_role(value);
        if role.is_none() {
            self.issue(format!(
                "{column} '{value}' is not one of: {}",
                crate::roles::ALL_ROLES.join(", ")
            ));
        }
        role
    }

    fn optional_password(&mut self, column: &str) -> Option<String> {
        // Passwords are taken verbatim; only fully blank cells count as absent.
        let value = self.row.get(column).filter(|v| !v.trim().is_empty())?;
        if let Err(message) = validate_password_strength(value, MIN_PASSWORD_LENGTH) {
            self.issue(message);
            return None;
        }
        Some(value.clone())
    }
}

/// Parse a whole number, accepting spreadsheet renderings such as `12.0`.
fn parse_whole_number(value: &str) -> Option<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let (whole, fraction) = value.split_once('.')?;
    if !fraction.is_empty() && fraction.chars().all(|c| c == '0') {
        return whole.parse().ok();
    }
    None
}

/// Parse a non-negative decimal amount into integer cents without floats.
pub fn parse_price_cents(value: &str) -> Option<i64> {
    let captures = PRICE_RE.captures(value.trim())?;
    let whole: i64 = captures.get(1)?.as_str().parse().ok()?;
    let cents = match captures.get(2).map(|m| m.as_str()) {
        None => 0,
        Some(digits) if digits.len() == 1 => digits.parse::<i64>().ok()? * 10,
        Some(digits) => digits.parse::<i64>().ok()?,
    };
    whole.checked_mul(100)?.checked_add(cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn messages(errors: Vec<ImportError>) -> Vec<String> {
        errors.into_iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn supplier_row_converts() {
        let r = row(&[("name", " Green Roots "), ("email", "info@greenroots.test"), ("city", "")]);
        let record = parse_row(TargetKind::Suppliers, &r, 2).unwrap();
        assert_matches!(record, ImportRecord::Supplier(s) => {
            assert_eq!(s.name, "Green Roots");
            assert_eq!(s.email.as_deref(), Some("info@greenroots.test"));
            assert_eq!(s.city, None);
        });
    }

    #[test]
    fn blank_required_name_is_reported_with_row_number() {
        let r = row(&[("name", "   ")]);
        let errors = parse_row(TargetKind::Suppliers, &r, 5).unwrap_err();
        assert_eq!(messages(errors), vec!["Row 5: name is required"]);
    }

    #[test]
    fn plant_collects_every_violation() {
        let r = row(&[
            ("name", ""),
            ("latin_name", "Acer"),
            ("supplier_id", "abc"),
            ("price", "12.345"),
            ("stock_quantity", "-3"),
        ]);
        let errors = messages(parse_row(TargetKind::Plants, &r, 3).unwrap_err());
        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("name is required"));
        assert!(errors[1].contains("supplier_id must be a positive whole number"));
        assert!(errors[2].contains("price must be a decimal amount"));
        assert!(errors[3].contains("stock_quantity must be a non-negative"));
    }

    #[test]
    fn plant_accepts_spreadsheet_numbers() {
        let r = row(&[
            ("name", "Japanese Maple"),
            ("latin_name", "Acer palmatum"),
            ("supplier_id", "7.0"),
            ("price", "49,9"),
            ("height_cm", "120"),
        ]);
        let record = parse_row(TargetKind::Plants, &r, 2).unwrap();
        assert_matches!(record, ImportRecord::Plant(p) => {
            assert_eq!(p.supplier_id, 7);
            assert_eq!(p.price_cents, 4990);
            assert_eq!(p.height_cm, Some(120));
        });
    }

    #[test]
    fn absent_columns_are_left_to_the_schema_check() {
        let r = row(&[("name", "Fern")]);
        let record = parse_row(TargetKind::Products, &r, 2).unwrap();
        assert_matches!(record, ImportRecord::Product(p) => assert_eq!(p.price_cents, 0));
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price_cents("0"), Some(0));
        assert_eq!(parse_price_cents("12"), Some(1200));
        assert_eq!(parse_price_cents("12.5"), Some(1250));
        assert_eq!(parse_price_cents("12.05"), Some(1205));
        assert_eq!(parse_price_cents("-1"), None);
        assert_eq!(parse_price_cents("1.234"), None);
        assert_eq!(parse_price_cents("ten"), None);
    }

    #[test]
    fn client_requires_valid_email() {
        let r = row(&[("name", "Ms Rose"), ("email", "not-an-email")]);
        let errors = messages(parse_row(TargetKind::Clients, &r, 2).unwrap_err());
        assert_eq!(errors, vec!["Row 2: email 'not-an-email' is not a valid email address"]);
    }

    #[test]
    fn user_row_rules() {
        let r = row(&[
            ("username", "a b"),
            ("email", "x@y.test"),
            ("role", "gardener"),
            ("password", "short"),
        ]);
        let errors = messages(parse_row(TargetKind::Users, &r, 2).unwrap_err());
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("username 'a b'"));
        assert!(errors[1].contains("role 'gardener'"));
        assert!(errors[2].contains("at least 12 characters"));
    }

    #[test]
    fn user_blank_password_is_absent() {
        let r = row(&[("username", "j.doe"), ("email", "j@doe.test"), ("password", "")]);
        let record = parse_row(TargetKind::Users, &r, 2).unwrap();
        assert_matches!(record, ImportRecord::User(u) => {
            assert!(u.password.is_none());
            assert!(u.role.is_none());
        });
    }

    #[test]
    fn identity_is_trimmed_and_case_insensitive() {
        let a = parse_row(TargetKind::Suppliers, &row(&[("name", "Oak Nursery")]), 2).unwrap();
        let b = parse_row(TargetKind::Suppliers, &row(&[("name", "  oak NURSERY ")]), 3).unwrap();
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn plant_identity_includes_supplier() {
        let base = [("name", "Fern"), ("latin_name", ""), ("price", "1")];
        let mut r1 = row(&base);
        r1.insert("supplier_id".into(), "1".into());
        let mut r2 = row(&base);
        r2.insert("supplier_id".into(), "2".into());
        let a = parse_row(TargetKind::Plants, &r1, 2).unwrap();
        let b = parse_row(TargetKind::Plants, &r2, 3).unwrap();
        assert_ne!(a.identity(), b.identity());
        assert_eq!(a.referenced_supplier(), Some(1));
    }

    #[test]
    fn plaintext_password_is_never_serialized() {
        let r = row(&[
            ("username", "j.doe"),
            ("email", "j@doe.test"),
            ("password", "a-long-enough-secret"),
        ]);
        let record = parse_row(TargetKind::Users, &r, 2).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("a-long-enough-secret"));
    }
}
