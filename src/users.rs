use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Context, anyhow};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct UserAccount {
    pub email: String,
    pub name: String,
    password_hash: String,
}

pub enum SignupOutcome {
    Created,
    EmailTaken,
}

/// Volatile account store keyed by email. Accounts are created on signup and
/// read on login; nothing ever updates or deletes them, so a plain RwLock'd
/// map is enough. Lives for the process lifetime.
#[derive(Default)]
pub struct UserStore {
    accounts: RwLock<HashMap<String, UserAccount>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_if_absent(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> anyhow::Result<SignupOutcome> {
        let password_hash = hash_password(password)?;
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        if accounts.contains_key(email) {
            return Ok(SignupOutcome::EmailTaken);
        }
        accounts.insert(
            email.to_string(),
            UserAccount {
                email: email.to_string(),
                name: name.to_string(),
                password_hash,
            },
        );
        Ok(SignupOutcome::Created)
    }

    /// Returns the account when the email exists and the password verifies.
    pub fn authenticate(&self, email: &str, password: &str) -> Option<UserAccount> {
        let accounts = self.accounts.read().ok()?;
        let account = accounts.get(email)?;
        if verify_password(&account.password_hash, password) {
            Some(account.clone())
        } else {
            None
        }
    }
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("hash password: {e}"))?;
    Ok(hash.to_string())
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: usize,
}

pub fn issue_token(secret: &str, account: &UserAccount) -> anyhow::Result<String> {
    let exp = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub: account.email.clone(),
        name: account.name.clone(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("sign auth token")
}

pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}
