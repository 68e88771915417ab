//! Repository for the `suppliers` table.

use sqlx::PgPool;
use verdant_core::import::rules::SupplierRecord;
use verdant_core::types::DbId;

use crate::models::supplier::Supplier;

/// Column list for suppliers queries.
const COLUMNS: &str = "id, name, contact_person, email, phone, address, city, \
    postal_code, website, notes, created_at, updated_at";

/// Provides import operations for suppliers.
pub struct SupplierRepo;

impl SupplierRepo {
    /// Find a supplier by name, trimmed and case-insensitive.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Supplier>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM suppliers WHERE lower(btrim(name)) = lower(btrim($1))"
        );
        sqlx::query_as::<_, Supplier>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Create a supplier, returning the created row.
    pub async fn create(pool: &PgPool, input: &SupplierRecord) -> Result<Supplier, sqlx::Error> {
        let query = format!(
            "INSERT INTO suppliers
                (name, contact_person, email, phone, address, city, postal_code, website, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Supplier>(&query)
            .bind(&input.name)
            .bind(&input.contact_person)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.postal_code)
            .bind(&input.website)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Overwrite every imported column of a supplier.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &SupplierRecord,
    ) -> Result<Option<Supplier>, sqlx::Error> {
        let query = format!(
            "UPDATE suppliers SET
                name = $2,
                contact_person = $3,
                email = $4,
                phone = $5,
                address = $6,
                city = $7,
                postal_code = $8,
                website = $9,
                notes = $10,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Supplier>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.contact_person)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.postal_code)
            .bind(&input.website)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(pool)
            .await
    }
}
