//! Back-office user accounts.
//!
//! Passwords are kept as a salted SHA-256 digest and are never readable back.
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{BackofficeError, Result};
use crate::types::TimeStamp;
use crate::utils;

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
#[cbor(index_only)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[n(0)]
    Admin,
    #[n(1)]
    Cashier,
    #[n(2)]
    Salesperson,
    #[n(3)]
    Assistant,
}

impl FromStr for Role {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "cashier" => Ok(Role::Cashier),
            "salesperson" => Ok(Role::Salesperson),
            "assistant" => Ok(Role::Assistant),
            _ => Err(BackofficeError::Validation(format!("Invalid role {s:?}"))),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct User {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub username: String,
    #[n(2)]
    pub role: Role,
    #[n(3)]
    salt: String,
    #[n(4)]
    password_digest: String,
    #[n(5)]
    pub created_at: TimeStamp<Utc>,
    #[n(6)]
    pub last_login: Option<TimeStamp<Utc>>,
}

/// What leaves the service: everything except credentials.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_at: TimeStamp<Utc>,
    pub last_login: Option<TimeStamp<Utc>>,
}

pub fn normalise_username(username: &str) -> Result<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(BackofficeError::Validation("Username is required".into()));
    }
    Ok(username.to_string())
}

fn check_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(BackofficeError::Validation("Password is required".into()));
    }
    Ok(())
}

impl User {
    pub fn new(id: String, username: &str, password: &str, role: Role) -> Result<Self> {
        let username = normalise_username(username)?;
        check_password(password)?;
        let salt = utils::new_salt();
        let password_digest = utils::salted_digest(&salt, password);

        Ok(Self {
            id,
            username,
            role,
            salt,
            password_digest,
            created_at: TimeStamp::new(),
            last_login: None,
        })
    }

    pub fn set_password(&mut self, password: &str) -> Result<()> {
        check_password(password)?;
        self.salt = utils::new_salt();
        self.password_digest = utils::salted_digest(&self.salt, password);
        Ok(())
    }

    pub fn verify_password(&self, password: &str) -> bool {
        utils::salted_digest(&self.salt, password) == self.password_digest
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
            created_at: self.created_at.clone(),
            last_login: self.last_login.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub role: Option<Role>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
