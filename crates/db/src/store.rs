//! PostgreSQL-backed [`ImportStore`].

use async_trait::async_trait;
use sqlx::PgPool;
use verdant_core::import::rules::{Identity, ImportRecord};
use verdant_core::import::store::{ImportStore, StoreError, UserConflict};
use verdant_core::import::TargetKind;
use verdant_core::roles::DEFAULT_IMPORT_ROLE;
use verdant_core::types::DbId;

use crate::repositories::{ClientRepo, PlantRepo, ProductRepo, SupplierRepo, UserRepo};

/// PostgreSQL SQLSTATE codes the importer distinguishes.
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const NOT_NULL_VIOLATION: &str = "23502";
const STRING_TOO_LONG: &str = "22001";
const NUMERIC_OUT_OF_RANGE: &str = "22003";

#[derive(Debug, Clone)]
pub struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a sqlx error raised while writing `record` to a [`StoreError`].
fn classify_write_error(err: sqlx::Error, record: &ImportRecord) -> StoreError {
    let sqlx::Error::Database(db_err) = &err else {
        return classify_read_error(err);
    };
    let code = db_err.code().map(|c| c.into_owned());
    match code.as_deref() {
        Some(FOREIGN_KEY_VIOLATION) => match record.referenced_supplier() {
            Some(id) => StoreError::ForeignKey(format!("supplier {id} does not exist")),
            None => StoreError::ForeignKey(db_err.message().to_string()),
        },
        Some(UNIQUE_VIOLATION) => match (record, db_err.constraint()) {
            (ImportRecord::User(user), Some("uq_users_email")) => {
                StoreError::UniqueViolation(format!("email '{}' is already in use", user.email))
            }
            _ => StoreError::UniqueViolation(format!(
                "{} '{}' already exists",
                record.kind().entity_name(),
                record.identity()
            )),
        },
        Some(CHECK_VIOLATION | NOT_NULL_VIOLATION | STRING_TOO_LONG | NUMERIC_OUT_OF_RANGE) => {
            StoreError::Invalid(db_err.message().to_string())
        }
        _ => classify_read_error(err),
    }
}

fn classify_read_error(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Database error during import");
    StoreError::Backend(err.to_string())
}

fn not_found(record: &ImportRecord, id: DbId) -> StoreError {
    StoreError::Invalid(format!("{} {id} does not exist", record.kind().entity_name()))
}

#[async_trait]
impl ImportStore for PgImportStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(classify_read_error)
    }

    async fn find_existing(&self, identity: &Identity) -> Result<Option<DbId>, StoreError> {
        let pool = &self.pool;
        let key = |index: usize| identity.key.get(index).map(String::as_str).unwrap_or("");
        let row_id = match identity.kind {
            TargetKind::Suppliers => SupplierRepo::find_by_name(pool, key(0))
                .await
                .map(|row| row.map(|s| s.id)),
            TargetKind::Plants => {
                let supplier_id: DbId = key(1).parse().map_err(|_| {
                    StoreError::Invalid(format!("invalid supplier id '{}'", key(1)))
                })?;
                PlantRepo::find_by_name(pool, key(0), supplier_id)
                    .await
                    .map(|row| row.map(|p| p.id))
            }
            TargetKind::Products => ProductRepo::find_by_name(pool, key(0))
                .await
                .map(|row| row.map(|p| p.id)),
            TargetKind::Clients => ClientRepo::find_by_email(pool, key(0))
                .await
                .map(|row| row.map(|c| c.id)),
            TargetKind::Users => UserRepo::find_by_username(pool, key(0))
                .await
                .map(|row| row.map(|u| u.id)),
        };
        row_id.map_err(classify_read_error)
    }

    async fn create(&self, record: &ImportRecord) -> Result<DbId, StoreError> {
        let pool = &self.pool;
        let id = match record {
            ImportRecord::Supplier(r) => SupplierRepo::create(pool, r).await.map(|s| s.id),
            ImportRecord::Plant(r) => PlantRepo::create(pool, r).await.map(|p| p.id),
            ImportRecord::Product(r) => ProductRepo::create(pool, r).await.map(|p| p.id),
            ImportRecord::Client(r) => ClientRepo::create(pool, r).await.map(|c| c.id),
            ImportRecord::User(r) => {
                let credentials = r.credentials.as_ref().ok_or_else(|| {
                    StoreError::Invalid("user accounts require a password hash".to_string())
                })?;
                let role = r.role.unwrap_or(DEFAULT_IMPORT_ROLE);
                UserRepo::create(pool, r, credentials, role).await.map(|u| u.id)
            }
        };
        id.map_err(|e| classify_write_error(e, record))
    }

    async fn update(&self, id: DbId, record: &ImportRecord) -> Result<(), StoreError> {
        let pool = &self.pool;
        let updated = match record {
            ImportRecord::Supplier(r) => SupplierRepo::update(pool, id, r).await.map(|o| o.is_some()),
            ImportRecord::Plant(r) => PlantRepo::update(pool, id, r).await.map(|o| o.is_some()),
            ImportRecord::Product(r) => ProductRepo::update(pool, id, r).await.map(|o| o.is_some()),
            ImportRecord::Client(r) => ClientRepo::update(pool, id, r).await.map(|o| o.is_some()),
            ImportRecord::User(r) => UserRepo::update(pool, id, r).await.map(|o| o.is_some()),
        }
        .map_err(|e| classify_write_error(e, record))?;

        if updated {
            Ok(())
        } else {
            Err(not_found(record, id))
        }
    }

    async fn supplier_exists(&self, id: DbId) -> Result<bool, StoreError> {
        SupplierRepo::exists(&self.pool, id)
            .await
            .map_err(classify_read_error)
    }

    async fn count(&self, kind: TargetKind) -> Result<i64, StoreError> {
        let pool = &self.pool;
        let count = match kind {
            TargetKind::Suppliers => SupplierRepo::count(pool).await,
            TargetKind::Plants => PlantRepo::count(pool).await,
            TargetKind::Products => ProductRepo::count(pool).await,
            TargetKind::Clients => ClientRepo::count(pool).await,
            TargetKind::Users => UserRepo::count(pool).await,
        };
        count.map_err(classify_read_error)
    }

    async fn find_user_conflict(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserConflict>, StoreError> {
        let conflict = UserRepo::find_conflict(&self.pool, username, email)
            .await
            .map_err(classify_read_error)?;
        Ok(conflict.map(|username_taken| {
            if username_taken {
                UserConflict::Username
            } else {
                UserConflict::Email
            }
        }))
    }
}
