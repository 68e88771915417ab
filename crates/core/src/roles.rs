//! Well-known role name constants.
//!
//! These must match the `CHECK` constraint on `users.role` in
//! `20260301000005_create_users.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_STAFF: &str = "staff";

/// Every role an imported user may be assigned.
pub const ALL_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_MANAGER, ROLE_STAFF];

/// Role given to imported users whose `role` cell is blank.
pub const DEFAULT_IMPORT_ROLE: &str = ROLE_STAFF;

/// Resolve a role cell (case-insensitive) to its canonical name.
pub fn parse_role(value: &str) -> Option<&'static str> {
    let lowered = value.trim().to_lowercase();
    ALL_ROLES.iter().copied().find(|role| *role == lowered)
}
