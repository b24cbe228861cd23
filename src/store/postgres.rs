use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::PgPool;

use super::{Repository, StoreError};
use crate::models::admin::Administrator;
use crate::models::user::User;

/// Identity schema; applied by `serve` and by `admin create`.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    pub fn users(&self) -> PgUserRepository {
        PgUserRepository {
            pool: self.pool.clone(),
        }
    }

    pub fn admins(&self) -> PgAdminRepository {
        PgAdminRepository {
            pool: self.pool.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

#[async_trait]
impl Repository<User> for PgUserRepository {
    async fn find_one_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, name, email, provider, password, logged_out, profile_picture_key FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn add_one(&self, user: &User) -> Result<User, StoreError> {
        // the unique index on email turns a racing insert into zero rows
        let row = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, name, email, provider, password, logged_out, profile_picture_key)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (email) DO NOTHING
               RETURNING id, name, email, provider, password, logged_out, profile_picture_key"#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.provider)
        .bind(&user.password)
        .bind(user.logged_out)
        .bind(&user.profile_picture_key)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::Conflict(format!("user {}", user.email)))
    }

    async fn update_one(&self, user: &User) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET name = $2, provider = $3, password = $4, logged_out = $5, profile_picture_key = $6
               WHERE id = $1
               RETURNING id, name, email, provider, password, logged_out, profile_picture_key"#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.provider)
        .bind(&user.password)
        .bind(user.logged_out)
        .bind(&user.profile_picture_key)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))
    }
}

#[derive(Clone)]
pub struct PgAdminRepository {
    pool: PgPool,
}

#[async_trait]
impl Repository<Administrator> for PgAdminRepository {
    async fn find_one_by_email(&self, email: &str) -> Result<Option<Administrator>, StoreError> {
        let row = sqlx::query_as::<_, Administrator>(
            "SELECT id, email, password, logged_out FROM administrators WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn add_one(&self, admin: &Administrator) -> Result<Administrator, StoreError> {
        let row = sqlx::query_as::<_, Administrator>(
            r#"INSERT INTO administrators (id, email, password, logged_out)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (email) DO NOTHING
               RETURNING id, email, password, logged_out"#,
        )
        .bind(admin.id)
        .bind(&admin.email)
        .bind(&admin.password)
        .bind(admin.logged_out)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::Conflict(format!("administrator {}", admin.email)))
    }

    async fn update_one(&self, admin: &Administrator) -> Result<Administrator, StoreError> {
        let row = sqlx::query_as::<_, Administrator>(
            r#"UPDATE administrators
               SET password = $2, logged_out = $3
               WHERE id = $1
               RETURNING id, email, password, logged_out"#,
        )
        .bind(admin.id)
        .bind(&admin.password)
        .bind(admin.logged_out)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("administrator {}", admin.id)))
    }
}
