//! Repository for the `products` table.

use sqlx::PgPool;
use verdant_core::import::rules::ProductRecord;
use verdant_core::types::DbId;

use crate::models::product::Product;

const COLUMNS: &str = "id, name, price_cents, sku, category, unit, description, \
    supplier_id, stock_quantity, created_at, updated_at";

pub struct ProductRepo;

impl ProductRepo {
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Product>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM products WHERE lower(btrim(name)) = lower(btrim($1))"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, input: &ProductRecord) -> Result<Product, sqlx::Error> {
        let query = format!(
            "INSERT INTO products
                (name, price_cents, sku, category, unit, description, supplier_id, stock_quantity)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(&input.name)
            .bind(input.price_cents)
            .bind(&input.sku)
            .bind(&input.category)
            .bind(&input.unit)
            .bind(&input.description)
            .bind(input.supplier_id)
            .bind(input.stock_quantity)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &ProductRecord,
    ) -> Result<Option<Product>, sqlx::Error> {
        let query = format!(
            "UPDATE products SET
                name = $2,
                price_cents = $3,
                sku = $4,
                category = $5,
                unit = $6,
                description = $7,
                supplier_id = $8,
                stock_quantity = $9,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.price_cents)
            .bind(&input.sku)
            .bind(&input.category)
            .bind(&input.unit)
            .bind(&input.description)
            .bind(input.supplier_id)
            .bind(input.stock_quantity)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(pool)
            .await
    }
}
