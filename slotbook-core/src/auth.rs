use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{
    Database, DatabaseError, NewUser, PrimaryKey, UpdatedUser, UserData, UserRole,
};

/// Credential store and token gate. Issues HS256 bearer tokens and
/// checks presented tokens against both their signature and the single
/// active token stored per user.
pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Verified against when the username doesn't exist, so both
    /// failure paths cost a hash comparison
    dummy_hash: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The token signature is bad or the token has expired
    #[error("Invalid or expired token")]
    InvalidToken,
    /// The token is cryptographically valid but is no longer the
    /// stored active token for the user
    #[error("Session has been revoked. Please log in again")]
    SessionRevoked,
    #[error("Already logged out")]
    AlreadyLoggedOut,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

/// The resolved identity every authenticated operation consumes
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub id: PrimaryKey,
    pub role: UserRole,
}

/// A freshly issued login session
#[derive(Debug)]
pub struct SessionData {
    pub token: String,
    pub user: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: PrimaryKey,
    role: UserRole,
    iat: i64,
    exp: i64,
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const TOKEN_DURATION_IN_HOURS: i64 = 24;

    pub fn new(db: &Arc<Db>, secret: &str) -> Self {
        let argon = Argon2::default();

        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon
            .hash_password(b"slotbook-dummy", &salt)
            .map(|h| h.to_string())
            .unwrap_or_default();

        Self {
            db: db.clone(),
            argon,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            dummy_hash,
        }
    }

    /// Logs in a user, returning a new session. Any previously issued
    /// token becomes invalid.
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        let user = match self.db.user_by_username(&credentials.username).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound { .. }) => {
                self.verify_against(&credentials.password, &self.dummy_hash)
                    .ok();
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => return Err(AuthError::Db(err)),
        };

        self.verify_against(&credentials.password, &user.password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        self.issue_session(user).await
    }

    /// Creates a student account and logs it in right away
    pub async fn register(&self, new_user: NewRegistration) -> Result<SessionData, AuthError> {
        let hashed_password = self.hash(&new_user.password)?;

        let user = self
            .db
            .create_user(NewUser {
                id: new_user.id,
                username: new_user.username,
                name: new_user.name,
                password: hashed_password,
                role: UserRole::Student,
            })
            .await
            .map_err(AuthError::Db)?;

        log::info!("Registered new user {}", user.username);

        self.issue_session(user).await
    }

    /// Resolves a bearer token into an identity, verifying the
    /// signature and expiry first and the stored active token second
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AuthError::InvalidToken)?
            .claims;

        let user = match self.db.user_by_id(claims.id).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound { .. }) => return Err(AuthError::SessionRevoked),
            Err(err) => return Err(AuthError::Db(err)),
        };

        if user.access_token.as_deref() != Some(token) {
            return Err(AuthError::SessionRevoked);
        }

        Ok(Identity {
            id: user.id,
            role: user.role,
        })
    }

    /// Clears the stored active token
    pub async fn logout(&self, user_id: PrimaryKey) -> Result<(), AuthError> {
        let user = self.db.user_by_id(user_id).await.map_err(AuthError::Db)?;

        if user.access_token.is_none() {
            return Err(AuthError::AlreadyLoggedOut);
        }

        self.db
            .set_access_token(user_id, None)
            .await
            .map_err(AuthError::Db)
    }

    /// Applies a partial profile update, rehashing the password if a
    /// new one is supplied
    pub async fn update_profile(&self, update: UpdatedProfile) -> Result<UserData, AuthError> {
        let password = update
            .new_password
            .as_deref()
            .map(|p| self.hash(p))
            .transpose()?;

        self.db
            .update_user(UpdatedUser {
                id: update.id,
                username: update.username,
                name: update.name,
                password,
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Returns the user record for an already resolved identity
    pub async fn user(&self, user_id: PrimaryKey) -> Result<UserData, DatabaseError> {
        self.db.user_by_id(user_id).await
    }

    async fn issue_session(&self, user: UserData) -> Result<SessionData, AuthError> {
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::hours(Self::TOKEN_DURATION_IN_HOURS);

        let claims = Claims {
            id: user.id,
            role: user.role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.db
            .set_access_token(user.id, Some(&token))
            .await
            .map_err(AuthError::Db)?;

        Ok(SessionData { token, user })
    }

    fn verify_against(&self, password: &str, hash: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::parse(hash, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewRegistration {
    pub id: PrimaryKey,
    pub username: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Default)]
pub struct UpdatedProfile {
    pub id: PrimaryKey,
    pub username: Option<String>,
    pub name: Option<String>,
    pub new_password: Option<String>,
}
