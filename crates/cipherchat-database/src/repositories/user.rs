//! User directory repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cipherchat_core::error::{AppError, ErrorKind};
use cipherchat_core::result::AppResult;
use cipherchat_core::traits::user_directory::{DeviceRegistration, UserDirectory};
use cipherchat_entity::user::User;

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to find user by phone",
                    e,
                )
            })
    }

    async fn create_or_update_device(
        &self,
        phone: &str,
        registration: DeviceRegistration,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users \
               (id, phone, role, public_key, push_token, device_name, last_ip, created_at, updated_at) \
             VALUES ($1, $2, 'user', $3, $4, $5, $6, NOW(), NOW()) \
             ON CONFLICT (phone) DO UPDATE SET \
               public_key = EXCLUDED.public_key, \
               push_token = EXCLUDED.push_token, \
               device_name = EXCLUDED.device_name, \
               last_ip = EXCLUDED.last_ip, \
               updated_at = NOW() \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(phone)
        .bind(&registration.public_key)
        .bind(&registration.push_token)
        .bind(&registration.device_name)
        .bind(&registration.last_ip)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::StoreUnavailable,
                "Failed to create or update user",
                e,
            )
        })
    }
}
