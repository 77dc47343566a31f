//! Authentication and user account service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{normalize_email, Caller, ChangePassword, RegisterUser, Role, User, UserClaims},
    repository::Store,
};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    config: AuthConfig,
    /// Keyed by normalized email
    users: Arc<RwLock<IndexMap<String, User>>>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, config: AuthConfig, users: Vec<User>) -> Self {
        let users = users.into_iter().map(|u| (u.email.clone(), u)).collect();
        Self {
            store,
            config,
            users: Arc::new(RwLock::new(users)),
        }
    }

    /// Create a regular user account
    pub async fn register(&self, registration: RegisterUser) -> AppResult<User> {
        self.create_user(
            registration.name.trim(),
            &registration.email,
            &registration.password,
            Role::User,
        )
        .await
    }

    /// Authenticate by email and password and return a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .users
            .read()
            .await
            .get(&normalize_email(email))
            .cloned()
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token(&user)?;
        tracing::info!(user = %user.email, "User logged in");
        Ok((token, user))
    }

    /// Account of the authenticated caller
    pub async fn me(&self, caller: &Caller) -> AppResult<User> {
        self.users
            .read()
            .await
            .get(&caller.email)
            .cloned()
            .ok_or_else(|| AppError::Authentication("User no longer exists".to_string()))
    }

    pub async fn change_password(&self, caller: &Caller, change: ChangePassword) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get(&caller.email)
            .ok_or_else(|| AppError::Authentication("User no longer exists".to_string()))?;

        if !verify_password(user, &change.current_password)? {
            return Err(AppError::BadRequest("Current password is incorrect".to_string()));
        }
        if change.current_password == change.new_password {
            return Err(AppError::BadRequest(
                "New password must be different from current password".to_string(),
            ));
        }

        let mut updated = user.clone();
        updated.password_hash = hash_password(&change.new_password)?;

        self.store.save_user(&updated).await?;
        tracing::info!(user = %updated.email, "Password changed");
        users.insert(updated.email.clone(), updated);
        Ok(())
    }

    /// Create the configured administrator account if it does not exist yet
    pub async fn ensure_admin(&self) -> AppResult<()> {
        let seed = &self.config.admin;
        let email = normalize_email(&seed.email);
        if self.users.read().await.contains_key(&email) {
            return Ok(());
        }

        self.create_user(&seed.name, &email, &seed.password, Role::Admin).await?;
        tracing::info!(admin = %email, "Default administrator created");
        Ok(())
    }

    async fn create_user(&self, name: &str, email: &str, password: &str, role: Role) -> AppResult<User> {
        let email = normalize_email(email);
        let mut users = self.users.write().await;

        if users.contains_key(&email) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            role,
            created_at: Utc::now(),
        };

        self.store.save_user(&user).await?;
        users.insert(email, user.clone());

        tracing::info!(user = %user.email, role = %user.role, "User registered");
        Ok(user)
    }

    /// Issue a JWT for a user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
