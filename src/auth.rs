// Accounts, credential verification and sessions

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    notify::{Classify, FailureKind},
    store::{load_collection, save_collection, IdGenerator, KeyValueStore, StoreError, USERS_KEY},
};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Email already in use: {0}")]
    EmailTaken(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session is missing or expired")]
    NotAuthenticated,

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("Invalid auth configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl Classify for AuthError {
    fn kind(&self) -> FailureKind {
        match self {
            AuthError::EmailTaken(_) => FailureKind::Conflict,
            AuthError::Hashing(_) | AuthError::InvalidConfig(_) | AuthError::Storage(_) => {
                FailureKind::Internal
            }
            _ => FailureKind::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Stored account: the public user plus its argon2 hash
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credential {
    #[serde(flatten)]
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: Uuid,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    user_id: u64,
    expires_at: DateTime<Utc>,
}

// Fields left as None are kept
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(value: &str, field: &'static str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(())
}

pub struct AuthService {
    store: Arc<dyn KeyValueStore>,
    config: AuthConfig,
    session_ttl: Duration,
    hasher: Argon2<'static>,
    credentials: RwLock<Vec<Credential>>,
    sessions: DashMap<Uuid, SessionEntry>,
    ids: IdGenerator,
}

impl AuthService {
    // Loads accounts from `store`. An empty store is seeded with the two demo
    // accounts (`admin@example.com` / `admin123`, `user@example.com` / `user123`).
    pub async fn load(store: Arc<dyn KeyValueStore>, config: AuthConfig) -> Result<Self, AuthError> {
        let params = Params::new(config.hash_memory_kib, config.hash_iterations, 1, None)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let session_ttl = parse_session_ttl(config.session_ttl_minutes)?;

        let mut credentials: Vec<Credential> = load_collection(store.as_ref(), USERS_KEY).await?;
        let seeded = credentials.is_empty();
        if seeded {
            credentials = demo_accounts(&hasher)?;
            save_collection(store.as_ref(), USERS_KEY, credentials.as_slice()).await?;
        }

        let max_id = credentials.iter().map(|c| c.user.id).max().unwrap_or(0);
        info!(accounts = credentials.len(), seeded, "auth service loaded");

        Ok(Self {
            store,
            config,
            session_ttl,
            hasher,
            credentials: RwLock::new(credentials),
            sessions: DashMap::new(),
            ids: IdGenerator::starting_after(max_id),
        })
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Session, AuthError> {
        required(name, "name")?;
        required(email, "email")?;
        required(password, "password")?;
        required(confirm_password, "confirm password")?;

        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail(email));
        }
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if password.chars().count() < self.config.min_password_len {
            return Err(AuthError::PasswordTooShort(self.config.min_password_len));
        }

        let password_hash = hash_password(&self.hasher, password)?;

        let mut credentials = self.credentials.write().await;
        if credentials.iter().any(|c| c.user.email == email) {
            return Err(AuthError::EmailTaken(email));
        }

        let user = User {
            id: self.ids.next_id(),
            name: name.trim().to_string(),
            email,
            role: Role::User,
            phone: None,
            address: None,
        };
        credentials.push(Credential {
            user: user.clone(),
            password_hash,
        });
        if let Err(e) = save_collection(self.store.as_ref(), USERS_KEY, credentials.as_slice()).await {
            credentials.pop();
            return Err(e.into());
        }
        drop(credentials);

        info!(user_id = user.id, "account registered");
        self.open_session(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let credential = {
            let credentials = self.credentials.read().await;
            credentials.iter().find(|c| c.user.email == email).cloned()
        };

        let Some(credential) = credential else {
            warn!("login for unknown account");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&self.hasher, password, &credential.password_hash)? {
            warn!(user_id = credential.user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = credential.user.id, "logged in");
        self.open_session(credential.user)
    }

    pub fn logout(&self, token: &Uuid) -> bool {
        let removed = self.sessions.remove(token);
        if let Some((_, entry)) = &removed {
            debug!(user_id = entry.user_id, "logged out");
        }
        removed.is_some()
    }

    // Resolves a session token to the current state of its user.
    pub async fn authenticate(&self, token: &Uuid) -> Result<User, AuthError> {
        let entry = self
            .sessions
            .get(token)
            .map(|e| *e.value())
            .ok_or(AuthError::NotAuthenticated)?;

        if entry.expires_at <= Utc::now() {
            self.sessions.remove(token);
            debug!(user_id = entry.user_id, "session expired");
            return Err(AuthError::NotAuthenticated);
        }

        let credentials = self.credentials.read().await;
        credentials
            .iter()
            .find(|c| c.user.id == entry.user_id)
            .map(|c| c.user.clone())
            .ok_or(AuthError::NotAuthenticated)
    }

    pub async fn update_profile(&self, token: &Uuid, update: ProfileUpdate) -> Result<User, AuthError> {
        let user = self.authenticate(token).await?;

        let email = match &update.email {
            Some(email) => {
                let email = normalize_email(email);
                if !is_valid_email(&email) {
                    return Err(AuthError::InvalidEmail(email));
                }
                Some(email)
            }
            None => None,
        };
        if let Some(name) = &update.name {
            required(name, "name")?;
        }

        let mut credentials = self.credentials.write().await;
        if let Some(email) = &email {
            if credentials
                .iter()
                .any(|c| c.user.id != user.id && &c.user.email == email)
            {
                return Err(AuthError::EmailTaken(email.clone()));
            }
        }

        let index = credentials
            .iter()
            .position(|c| c.user.id == user.id)
            .ok_or(AuthError::NotAuthenticated)?;
        let previous = credentials[index].user.clone();

        let target = &mut credentials[index].user;
        if let Some(name) = update.name {
            target.name = name.trim().to_string();
        }
        if let Some(email) = email {
            target.email = email;
        }
        if let Some(phone) = update.phone {
            target.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(address) = update.address {
            target.address = Some(address).filter(|a| !a.trim().is_empty());
        }
        let updated = target.clone();

        if let Err(e) = save_collection(self.store.as_ref(), USERS_KEY, credentials.as_slice()).await {
            credentials[index].user = previous;
            return Err(e.into());
        }

        info!(user_id = updated.id, "profile updated");
        Ok(updated)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    // Also sweeps sessions that expired without being used again
    fn open_session(&self, user: User) -> Result<Session, AuthError> {
        let now = Utc::now();
        self.sessions.retain(|_, entry| entry.expires_at > now);

        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .ok_or_else(|| AuthError::InvalidConfig("session expiry out of range".into()))?;
        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            SessionEntry {
                user_id: user.id,
                expires_at,
            },
        );
        Ok(Session {
            token,
            user,
            expires_at,
        })
    }
}

fn parse_session_ttl(minutes: i64) -> Result<Duration, AuthError> {
    Duration::try_minutes(minutes)
        .filter(|ttl| *ttl >= Duration::zero())
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| AuthError::InvalidConfig(format!("session ttl of {minutes} minutes")))
}

fn demo_accounts(hasher: &Argon2<'static>) -> Result<Vec<Credential>, AuthError> {
    Ok(vec![
        Credential {
            user: User {
                id: 1,
                name: "Admin User".into(),
                email: "admin@example.com".into(),
                role: Role::Admin,
                phone: None,
                address: None,
            },
            password_hash: hash_password(hasher, "admin123")?,
        },
        Credential {
            user: User {
                id: 2,
                name: "Test User".into(),
                email: "user@example.com".into(),
                role: Role::User,
                phone: Some("123-456-7890".into()),
                address: Some("123 Main St, City".into()),
            },
            password_hash: hash_password(hasher, "user123")?,
        },
    ])
}

fn hash_password(hasher: &Argon2<'static>, plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AuthError::Hashing(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn verify_password(hasher: &Argon2<'static>, plain: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        AuthError::Hashing(e.to_string())
    })?;
    Ok(hasher.verify_password(plain.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn auth_fixture() -> (Arc<MemoryStore>, AuthService) {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::load(store.clone(), AuthConfig::fast_for_tests())
            .await
            .expect("auth loads");
        (store, auth)
    }

    #[tokio::test]
    async fn test_demo_accounts_can_log_in() {
        let (_, auth) = auth_fixture().await;

        let admin = auth.login("admin@example.com", "admin123").await.unwrap();
        assert!(admin.user.is_admin());

        let user = auth.login("User@Example.com ", "user123").await.unwrap();
        assert_eq!(user.user.id, 2);
        assert_eq!(user.user.phone.as_deref(), Some("123-456-7890"));
        assert!(!user.user.is_admin());
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (_, auth) = auth_fixture().await;

        let err = auth.login("user@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let err = auth.login("nobody@example.com", "user123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(auth.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_passwords_are_stored_hashed() {
        let (store, _auth) = auth_fixture().await;
        let raw = store.get(USERS_KEY).await.unwrap().unwrap();
        assert!(!raw.contains("admin123"));
        assert!(raw.contains("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_, auth) = auth_fixture().await;

        let err = auth.register("", "a@b.co", "secret1", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingField("name")));

        let err = auth.register("Ann", "not-an-email", "secret1", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));

        let err = auth.register("Ann", "ann@example.com", "secret1", "secret2").await.unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));

        let err = auth.register("Ann", "ann@example.com", "abc", "abc").await.unwrap_err();
        assert!(matches!(err, AuthError::PasswordTooShort(6)));

        let err = auth
            .register("Ann", "USER@example.com", "secret1", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken(_)));
        assert_eq!(err.kind(), FailureKind::Conflict);
    }

    #[tokio::test]
    async fn test_register_then_login_again_after_reload() {
        let (store, auth) = auth_fixture().await;
        let session = auth
            .register("Ann Guest", "ann@example.com", "secret1", "secret1")
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::User);
        assert!(session.user.id > 2);

        let reloaded = AuthService::load(store, AuthConfig::fast_for_tests()).await.unwrap();
        let again = reloaded.login("ann@example.com", "secret1").await.unwrap();
        assert_eq!(again.user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_sessions_authenticate_and_log_out() {
        let (_, auth) = auth_fixture().await;
        let session = auth.login("user@example.com", "user123").await.unwrap();

        let user = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(user.email, "user@example.com");

        assert!(auth.logout(&session.token));
        assert!(!auth.logout(&session.token));
        assert!(matches!(
            auth.authenticate(&session.token).await,
            Err(AuthError::NotAuthenticated)
        ));
        assert!(auth.authenticate(&Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let config = AuthConfig {
            session_ttl_minutes: 0,
            ..AuthConfig::fast_for_tests()
        };
        let auth = AuthService::load(store, config).await.unwrap();

        let session = auth.login("user@example.com", "user123").await.unwrap();
        assert!(auth.authenticate(&session.token).await.is_err());
        assert_eq!(auth.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_unrepresentable_session_ttl_is_rejected() {
        for minutes in [i64::MAX, -5, 60 * 24 * 365 * 1_000_000] {
            let config = AuthConfig {
                session_ttl_minutes: minutes,
                ..AuthConfig::fast_for_tests()
            };
            let err = AuthService::load(Arc::new(MemoryStore::new()), config)
                .await
                .err()
                .unwrap();
            assert!(matches!(err, AuthError::InvalidConfig(_)), "ttl {minutes} accepted");
            assert_eq!(err.kind(), FailureKind::Internal);
        }
    }

    #[tokio::test]
    async fn test_opening_a_session_sweeps_expired_ones() {
        let (_, auth) = auth_fixture().await;
        let stale = Uuid::new_v4();
        auth.sessions.insert(
            stale,
            SessionEntry {
                user_id: 2,
                expires_at: Utc::now() - Duration::minutes(5),
            },
        );
        let kept = auth.login("admin@example.com", "admin123").await.unwrap();
        assert_eq!(auth.active_sessions(), 1);

        auth.login("user@example.com", "user123").await.unwrap();
        assert_eq!(auth.active_sessions(), 2);
        assert!(!auth.sessions.contains_key(&stale));
        assert!(auth.authenticate(&kept.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (_, auth) = auth_fixture().await;
        let session = auth.login("user@example.com", "user123").await.unwrap();

        let updated = auth
            .update_profile(
                &session.token,
                ProfileUpdate {
                    phone: Some("555-0100".into()),
                    address: Some("".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert_eq!(updated.address, None);
        assert_eq!(updated.name, "Test User");

        let err = auth
            .update_profile(
                &session.token,
                ProfileUpdate {
                    email: Some("admin@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken(_)));

        // authenticate sees the stored profile, not the one captured at login
        let current = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(current.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("guest@example.com"));
        assert!(!is_valid_email("guest@example"));
        assert!(!is_valid_email("guest example@x.io"));
    }
}
