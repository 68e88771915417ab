//! Plant model.

use serde::Serialize;
use sqlx::FromRow;
use verdant_core::types::{DbId, Timestamp};

/// A row from the `plants` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Plant {
    pub id: DbId,
    pub name: String,
    pub latin_name: Option<String>,
    pub supplier_id: DbId,
    pub price_cents: i64,
    pub height_cm: Option<i32>,
    pub pot_size: Option<String>,
    pub hardiness_zone: Option<String>,
    pub stock_quantity: Option<i32>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
