use serde::{Deserialize, Serialize};

use super::{KvStore, CURRENT_USER_KEY, USERS_KEY};

/// One registered account. The password is kept and compared as an opaque
/// plain string: this reproduces the client-side simulation it models and is
/// not real credential storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// Empty email or password; nothing was stored.
    EmptyField,
    /// An account with this email already exists; the stored account is
    /// untouched.
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    EmptyField,
    /// No account matches the email AND password pair.
    InvalidCredentials,
}

/// Registers a new account and marks it as the signed-in identity.
pub fn register(store: &mut dyn KvStore, email: &str, password: &str) -> Result<(), RegisterError> {
    if email.is_empty() || password.is_empty() {
        return Err(RegisterError::EmptyField);
    }

    let mut users = load_users(store);
    if users.iter().any(|user| user.email == email) {
        return Err(RegisterError::AlreadyExists);
    }

    users.push(Account {
        email: email.to_string(),
        password: password.to_string(),
    });
    save_users(store, &users);
    store.set(CURRENT_USER_KEY, email.to_string());
    Ok(())
}

/// Signs an existing account in. Succeeds only on an exact email + password
/// match.
pub fn authenticate(store: &mut dyn KvStore, email: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::EmptyField);
    }

    let users = load_users(store);
    if users
        .iter()
        .any(|user| user.email == email && user.password == password)
    {
        store.set(CURRENT_USER_KEY, email.to_string());
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

pub fn current_user(store: &dyn KvStore) -> Option<String> {
    store.get(CURRENT_USER_KEY)
}

pub fn logout(store: &mut dyn KvStore) {
    store.remove(CURRENT_USER_KEY);
}

/// A corrupt or unreadable user list is treated as empty: registration and
/// sign-in keep working instead of locking everyone out.
fn load_users(store: &dyn KvStore) -> Vec<Account> {
    let raw = match store.get(USERS_KEY) {
        Some(raw) => raw,
        None => return Vec::new(),
    };
    match serde_json::from_str(&raw) {
        Ok(users) => users,
        Err(err) => {
            log::warn!("Stored user list is corrupt, treating as empty: {}", err);
            Vec::new()
        }
    }
}

fn save_users(store: &mut dyn KvStore, users: &[Account]) {
    match serde_json::to_string(users) {
        Ok(raw) => store.set(USERS_KEY, raw),
        Err(err) => log::error!("Failed to serialize user list: {}", err),
    }
}
