//! Repository for the `plants` table.

use sqlx::PgPool;
use verdant_core::import::rules::PlantRecord;
use verdant_core::types::DbId;

use crate::models::plant::Plant;

/// Column list for plants queries.
const COLUMNS: &str = "id, name, latin_name, supplier_id, price_cents, height_cm, \
    pot_size, hardiness_zone, stock_quantity, notes, created_at, updated_at";

/// Provides import operations for plants.
pub struct PlantRepo;

impl PlantRepo {
    /// Find a plant by name within a supplier's catalog.
    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
        supplier_id: DbId,
    ) -> Result<Option<Plant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM plants
             WHERE lower(btrim(name)) = lower(btrim($1)) AND supplier_id = $2"
        );
        sqlx::query_as::<_, Plant>(&query)
            .bind(name)
            .bind(supplier_id)
            .fetch_optional(pool)
            .await
    }

    /// Create a plant, returning the created row.
    pub async fn create(pool: &PgPool, input: &PlantRecord) -> Result<Plant, sqlx::Error> {
        let query = format!(
            "INSERT INTO plants
                (name, latin_name, supplier_id, price_cents, height_cm, pot_size,
                 hardiness_zone, stock_quantity, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Plant>(&query)
            .bind(&input.name)
            .bind(&input.latin_name)
            .bind(input.supplier_id)
            .bind(input.price_cents)
            .bind(input.height_cm)
            .bind(&input.pot_size)
            .bind(&input.hardiness_zone)
            .bind(input.stock_quantity)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Overwrite every imported column of a plant.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &PlantRecord,
    ) -> Result<Option<Plant>, sqlx::Error> {
        let query = format!(
            "UPDATE plants SET
                name = $2,
                latin_name = $3,
                supplier_id = $4,
                price_cents = $5,
                height_cm = $6,
                pot_size = $7,
                hardiness_zone = $8,
                stock_quantity = $9,
                notes = $10,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Plant>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.latin_name)
            .bind(input.supplier_id)
            .bind(input.price_cents)
            .bind(input.height_cm)
            .bind(&input.pot_size)
            .bind(&input.hardiness_zone)
            .bind(input.stock_quantity)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM plants")
            .fetch_one(pool)
            .await
    }
}
