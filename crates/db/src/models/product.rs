use serde::Serialize;
use sqlx::FromRow;
use verdant_core::types::{DbId, Timestamp};

/// A row from the `products` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: DbId,
    pub name: String,
    pub price_cents: i64,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub supplier_id: Option<DbId>,
    pub stock_quantity: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
