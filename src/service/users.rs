use sled::Transactional;
use tracing::{info, warn};

use super::{BackofficeService, load, update_record};
use crate::error::{BackofficeError, Result};
use crate::store::{self, TxResult, abort, tx_get, tx_put};
use crate::types::TimeStamp;
use crate::user::{Credentials, NewUser, User, UserUpdate, UserView, normalise_username};
use crate::utils;

const WHAT: &str = "User";

fn username_taken(username: &str) -> BackofficeError {
    BackofficeError::Validation(format!("Username {username} is already taken"))
}

impl BackofficeService {
    pub fn create_user(&self, new: NewUser) -> Result<UserView> {
        let user = User::new(
            utils::new_uuid_to_bech32("user")?,
            &new.username,
            &new.password,
            new.role,
        )?;

        (&self.store.users, &self.store.usernames).transaction(
            |(users, usernames)| -> TxResult<()> {
                if usernames.get(user.username.as_bytes())?.is_some() {
                    return abort(Err(username_taken(&user.username)));
                }
                usernames.insert(user.username.as_bytes(), user.id.as_bytes())?;
                tx_put(users, &user.id, &user)?;
                Ok(())
            },
        )?;

        info!(id = %user.id, username = %user.username, role = ?user.role, "user created");
        Ok(user.view())
    }

    /// Checks credentials and stamps `last_login`.
    pub fn login(&self, credentials: Credentials) -> Result<UserView> {
        let username = credentials.username.trim();
        let Some(id) = self.store.usernames.get(username.as_bytes())? else {
            warn!(username, "login rejected");
            return Err(BackofficeError::Unauthorized);
        };
        let id = String::from_utf8_lossy(&id).into_owned();

        let user: User = load(&self.store.users, &id, WHAT)?;
        if !user.verify_password(&credentials.password) {
            warn!(username, "login rejected");
            return Err(BackofficeError::Unauthorized);
        }

        let user = update_record(&self.store.users, &id, WHAT, |user: &mut User| {
            user.last_login = Some(TimeStamp::new());
            Ok(())
        })?;
        info!(id = %user.id, username = %user.username, "user logged in");
        Ok(user.view())
    }

    pub fn list_users(&self) -> Result<Vec<UserView>> {
        let mut users: Vec<User> = store::scan(&self.store.users)?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users.iter().map(User::view).collect())
    }

    pub fn user_profile(&self, id: &str) -> Result<UserView> {
        let user: User = load(&self.store.users, id, WHAT)?;
        Ok(user.view())
    }

    /// Renames and/or changes the role of a user, keeping the username index
    /// in step.
    pub fn update_user(&self, id: &str, update: UserUpdate) -> Result<UserView> {
        let username = update
            .username
            .as_deref()
            .map(normalise_username)
            .transpose()?;

        let user = (&self.store.users, &self.store.usernames).transaction(
            |(users, usernames)| -> TxResult<User> {
                let mut user: User =
                    abort(tx_get(users, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;

                if let Some(username) = username.as_ref().filter(|u| **u != user.username) {
                    if usernames.get(username.as_bytes())?.is_some() {
                        return abort(Err(username_taken(username)));
                    }
                    usernames.remove(user.username.as_bytes())?;
                    usernames.insert(username.as_bytes(), id.as_bytes())?;
                    user.username = username.clone();
                }
                if let Some(role) = update.role {
                    user.role = role;
                }

                tx_put(users, id, &user)?;
                Ok(user)
            },
        )?;

        info!(id, username = %user.username, role = ?user.role, "user updated");
        Ok(user.view())
    }

    pub fn change_password(&self, id: &str, password: &str) -> Result<()> {
        update_record(&self.store.users, id, WHAT, |user: &mut User| {
            user.set_password(password)
        })?;
        info!(id, "password changed");
        Ok(())
    }

    /// Replaces the password with a generated one and returns it.
    pub fn reset_password(&self, id: &str) -> Result<String> {
        let temporary = utils::temporary_password();
        update_record(&self.store.users, id, WHAT, |user: &mut User| {
            user.set_password(&temporary)
        })?;
        info!(id, "password reset");
        Ok(temporary)
    }

    pub fn delete_user(&self, id: &str) -> Result<()> {
        (&self.store.users, &self.store.usernames).transaction(
            |(users, usernames)| -> TxResult<()> {
                let user: User = abort(tx_get(users, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;
                usernames.remove(user.username.as_bytes())?;
                users.remove(id)?;
                Ok(())
            },
        )?;

        info!(id, "user deleted");
        Ok(())
    }
}
