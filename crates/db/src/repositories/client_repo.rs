//! Repository for the `clients` table.

use sqlx::PgPool;
use verdant_core::import::rules::ClientRecord;
use verdant_core::types::DbId;

use crate::models::client::Client;

const COLUMNS: &str = "id, name, email, phone, company, address, city, postal_code, \
    notes, created_at, updated_at";

pub struct ClientRepo;

impl ClientRepo {
    /// Find a client by email, trimmed and case-insensitive.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Client>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clients WHERE lower(btrim(email)) = lower(btrim($1))"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, input: &ClientRecord) -> Result<Client, sqlx::Error> {
        let query = format!(
            "INSERT INTO clients
                (name, email, phone, company, address, city, postal_code, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.company)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.postal_code)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &ClientRecord,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!(
            "UPDATE clients SET
                name = $2,
                email = $3,
                phone = $4,
                company = $5,
                address = $6,
                city = $7,
                postal_code = $8,
                notes = $9,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.company)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.postal_code)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(pool)
            .await
    }
}
