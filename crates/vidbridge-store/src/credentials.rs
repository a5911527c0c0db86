//! Credential store: user registration, login, lookup

use crate::models::{PublicUser, User};
use crate::token::TokenService;
use crate::StoreError;
use async_trait::async_trait;
use bson::doc;
use chrono::Utc;
use mongodb::Collection;
use vidbridge_protocol::ids::short_id;

/// bcrypt work factor. The spec requires cost >= 10; bcrypt's own default
/// (12) already clears that bar.
const BCRYPT_COST: u32 = 12;

/// `register`/`login`/`getUser` against the durable user collection.
/// Implemented by a MongoDB-backed store in production and an
/// in-memory fake in tests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(String, PublicUser), StoreError>;

    async fn login(&self, email: &str, password: &str) -> Result<(String, PublicUser), StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<PublicUser>, StoreError>;
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn validate_registration(email: &str, username: &str, password: &str) -> Result<(), StoreError> {
    if !is_valid_email(email) {
        return Err(StoreError::Validation("malformed email".to_string()));
    }
    if !(3..=20).contains(&username.chars().count()) {
        return Err(StoreError::Validation(
            "username must be 3-20 characters".to_string(),
        ));
    }
    if password.len() < 6 {
        return Err(StoreError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// MongoDB-backed implementation of [`CredentialStore`].
pub struct MongoCredentialStore {
    users: Collection<User>,
    tokens: TokenService,
}

impl MongoCredentialStore {
    pub fn new(users: Collection<User>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }
}

#[async_trait]
impl CredentialStore for MongoCredentialStore {
    async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(String, PublicUser), StoreError> {
        let email = email.to_lowercase();
        validate_registration(&email, username, password)?;

        let existing = self
            .users
            .find_one(doc! { "$or": [ { "email": &email }, { "username": username } ] })
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        if existing.is_some() {
            return Err(StoreError::Conflict(
                "email or username already registered".to_string(),
            ));
        }

        let password_hash = {
            let password = password.to_string();
            tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))?
                .map_err(|e| StoreError::Transient(e.to_string()))?
        };

        let user = User {
            user_id: short_id(16),
            email,
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        };

        self.users
            .insert_one(&user)
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        let token = self.tokens.issue(&user.user_id)?;
        Ok((token, PublicUser::from(&user)))
    }

    async fn login(&self, email: &str, password: &str) -> Result<(String, PublicUser), StoreError> {
        let email = email.to_lowercase();
        let user = self
            .users
            .find_one(doc! { "email": &email })
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?
            .ok_or(StoreError::Unauthorized)?;

        let matches = {
            let password = password.to_string();
            let hash = user.password_hash.clone();
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))?
                .unwrap_or(false)
        };
        if !matches {
            return Err(StoreError::Unauthorized);
        }

        let token = self.tokens.issue(&user.user_id)?;
        Ok((token, PublicUser::from(&user)))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<PublicUser>, StoreError> {
        let user = self
            .users
            .find_one(doc! { "_id": user_id })
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(user.as_ref().map(PublicUser::from))
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    use super::*;
    use tokio::sync::RwLock;

    /// In-memory [`CredentialStore`] fake used by unit tests so the suite
    /// never needs a live database.
    #[derive(Default)]
    pub struct InMemoryCredentialStore {
        users: RwLock<Vec<User>>,
        tokens: Option<TokenService>,
    }

    impl InMemoryCredentialStore {
        pub fn new(tokens: TokenService) -> Self {
            Self {
                users: RwLock::new(Vec::new()),
                tokens: Some(tokens),
            }
        }

        fn tokens(&self) -> &TokenService {
            self.tokens.as_ref().expect("token service configured")
        }
    }

    #[async_trait]
    impl CredentialStore for InMemoryCredentialStore {
        async fn register(
            &self,
            email: &str,
            username: &str,
            password: &str,
        ) -> Result<(String, PublicUser), StoreError> {
            let email = email.to_lowercase();
            validate_registration(&email, username, password)?;

            let mut users = self.users.write().await;
            if users.iter().any(|u| u.email == email || u.username == username) {
                return Err(StoreError::Conflict(
                    "email or username already registered".to_string(),
                ));
            }

            let password_hash =
                bcrypt::hash(password, 4).map_err(|e| StoreError::Transient(e.to_string()))?;
            let user = User {
                user_id: short_id(16),
                email,
                username: username.to_string(),
                password_hash,
                created_at: Utc::now(),
            };
            users.push(user.clone());

            let token = self.tokens().issue(&user.user_id)?;
            Ok((token, PublicUser::from(&user)))
        }

        async fn login(
            &self,
            email: &str,
            password: &str,
        ) -> Result<(String, PublicUser), StoreError> {
            let email = email.to_lowercase();
            let users = self.users.read().await;
            let user = users
                .iter()
                .find(|u| u.email == email)
                .ok_or(StoreError::Unauthorized)?;
            if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
                return Err(StoreError::Unauthorized);
            }
            let token = self.tokens().issue(&user.user_id)?;
            Ok((token, PublicUser::from(user)))
        }

        async fn get_user(&self, user_id: &str) -> Result<Option<PublicUser>, StoreError> {
            let users = self.users.read().await;
            Ok(users.iter().find(|u| u.user_id == user_id).map(PublicUser::from))
        }
    }
}
