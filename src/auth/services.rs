use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::{
    error::AuthError,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::{User, UserStore},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Canonical form used for storage and lookup: emails are case-insensitive.
fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Orchestrates signup, login and current-user resolution over the user
/// store, the password hasher and the token issuer.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub async fn signup(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = canonical_email(email);

        if !is_valid_email(&email) {
            warn!(email = %email, "signup rejected: invalid email");
            return Err(AuthError::Validation("Invalid email".into()));
        }

        // Friendly fast path; the unique constraint in the store decides
        // races between concurrent signups.
        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "signup rejected: email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let hash = hash_password(password)?;
        let user = self.store.create(&email, name.trim(), &hash).await?;
        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = canonical_email(email);

        let user = match self.store.find_by_email(&email).await? {
            Some(u) => u,
            None => {
                warn!(email = %email, "login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.sign(&user.email)?;
        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(token)
    }

    pub async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        let claims = self
            .keys
            .verify(token)
            .map_err(|_| AuthError::Unauthorized)?;

        // The subject must still exist; stale claims never synthesize a user.
        match self.store.find_by_email(&claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                warn!(subject = %claims.sub, "token subject no longer exists");
                Err(AuthError::Unauthorized)
            }
        }
    }
}
