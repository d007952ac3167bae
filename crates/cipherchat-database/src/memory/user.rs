//! In-memory user directory using a Tokio mutex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use cipherchat_core::result::AppResult;
use cipherchat_core::traits::user_directory::{DeviceRegistration, UserDirectory};
use cipherchat_entity::identity::UserRole;
use cipherchat_entity::user::User;

/// In-memory user directory keyed by phone number.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    /// Protected user map.
    users: Arc<Mutex<HashMap<String, User>>>,
}

impl MemoryUserDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user with an explicit role (test helper).
    pub async fn insert_with_role(&self, phone: &str, role: UserRole) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            role,
            public_key: "pk".to_string(),
            push_token: None,
            device_name: None,
            last_ip: None,
            created_at: now,
            updated_at: now,
        };
        self.users
            .lock()
            .await
            .insert(phone.to_string(), user.clone());
        user
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().await.get(phone).cloned())
    }

    async fn create_or_update_device(
        &self,
        phone: &str,
        registration: DeviceRegistration,
    ) -> AppResult<User> {
        let mut users = self.users.lock().await;
        let now = Utc::now();
        let user = users
            .entry(phone.to_string())
            .and_modify(|u| {
                u.public_key = registration.public_key.clone();
                u.push_token = Some(registration.push_token.clone());
                u.device_name = Some(registration.device_name.clone());
                u.last_ip = registration.last_ip.clone();
                u.updated_at = now;
            })
            .or_insert_with(|| User {
                id: Uuid::new_v4(),
                phone: phone.to_string(),
                role: UserRole::User,
                public_key: registration.public_key.clone(),
                push_token: Some(registration.push_token.clone()),
                device_name: Some(registration.device_name.clone()),
                last_ip: registration.last_ip.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(device_name: &str, last_ip: &str, public_key: &str) -> DeviceRegistration {
        DeviceRegistration {
            device_name: device_name.to_string(),
            last_ip: Some(last_ip.to_string()),
            public_key: public_key.to_string(),
            push_token: "push".to_string(),
        }
    }

    #[tokio::test]
    async fn registration_records_the_device_summary() {
        let directory = MemoryUserDirectory::new();
        let user = directory
            .create_or_update_device("+15550001111", registration("Pixel 9", "10.0.0.1", "pk-1"))
            .await
            .unwrap();
        assert_eq!(user.device_name.as_deref(), Some("Pixel 9"));
        assert_eq!(user.last_ip.as_deref(), Some("10.0.0.1"));

        let updated = directory
            .create_or_update_device(
                "+15550001111",
                registration("Galaxy S25", "10.0.0.2", "pk-2"),
            )
            .await
            .unwrap();
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.device_name.as_deref(), Some("Galaxy S25"));
        assert_eq!(updated.last_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(updated.public_key, "pk-2");
    }
}
