//! The read-modify-write mutation engine for user records.
//!
//! `apply` is the single write path for the users table: load, run the
//! transition, run the level-up cascade, rewrite the table. Calls for the
//! same user are serialized through a per-user lock, so two concurrent
//! mutations cannot silently drop one another's writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use common::model::User;
use common::store::{CsvStore, TableRecord};

use super::{levels, DomainError, EngineError};

pub struct MutationEngine {
    store: Arc<CsvStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MutationEngine {
    pub fn new(store: Arc<CsvStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map mutex poisoned");
        Arc::clone(
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Forget the lock entry for an id that turned out not to exist, so
    /// probing unknown ids cannot grow the map without bound. Clones are
    /// only handed out under the map mutex, so the count is stable here.
    fn release_if_unused(&self, user_id: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().expect("lock map mutex poisoned");
        if Arc::strong_count(lock) == 2 {
            locks.remove(user_id);
        }
    }

    /// Load the user, apply `transition`, run the level-up cascade and
    /// persist the full table. All-or-nothing per call: a domain rejection
    /// or storage failure leaves the table untouched.
    pub fn apply<F>(&self, user_id: &str, transition: F) -> Result<User, EngineError>
    where
        F: FnOnce(&mut User) -> Result<(), DomainError>,
    {
        self.run(user_id, transition, |_, _| Ok(()))
    }

    /// Like [`Self::apply`], but also appends one row derived from the
    /// mutated user to another table, inside the same per-user critical
    /// section and before the users table is rewritten: a failed append
    /// aborts the call with the user record unchanged.
    pub fn apply_with_record<T, F, G>(
        &self,
        user_id: &str,
        transition: F,
        record: G,
    ) -> Result<User, EngineError>
    where
        T: TableRecord,
        F: FnOnce(&mut User) -> Result<(), DomainError>,
        G: FnOnce(&User) -> T,
    {
        self.run(user_id, transition, |store, user| {
            store.append(&record(user))
        })
    }

    fn run<F, S>(&self, user_id: &str, transition: F, side_effect: S) -> Result<User, EngineError>
    where
        F: FnOnce(&mut User) -> Result<(), DomainError>,
        S: FnOnce(&CsvStore, &User) -> Result<()>,
    {
        let lock = self.user_lock(user_id);
        let guard = lock.lock().expect("user lock poisoned");

        let mut users: Vec<User> = self.store.load_all()?;
        let Some(idx) = users.iter().position(|u| u.user_id == user_id) else {
            drop(guard);
            self.release_if_unused(user_id, &lock);
            return Err(EngineError::NotFound);
        };

        let mut user = users[idx].clone();
        transition(&mut user)?;

        let gained = levels::apply_level_cascade(&mut user);
        if gained > 0 {
            tracing::info!(
                user_id = user_id,
                level = user.level,
                gained = gained,
                "level up"
            );
        }

        side_effect(&self.store, &user)?;

        users[idx] = user.clone();
        self.store.rewrite_all(&users)?;
        Ok(user)
    }

    /// Insert a new user record. Creation is idempotent: if the id already
    /// exists the stored record is returned unchanged.
    pub fn create(&self, user: User) -> Result<User, EngineError> {
        let lock = self.user_lock(&user.user_id);
        let _guard = lock.lock().expect("user lock poisoned");

        let users: Vec<User> = self.store.load_all()?;
        if let Some(existing) = users.into_iter().find(|u| u.user_id == user.user_id) {
            return Ok(existing);
        }
        self.store.append(&user)?;
        tracing::info!(user_id = %user.user_id, pseudo = %user.pseudo, "user created");
        Ok(user)
    }

    /// Read one user record, bypassing any mutation.
    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        let users: Vec<User> = self.store.load_all()?;
        Ok(users.into_iter().find(|u| u.user_id == user_id))
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().expect("lock map mutex poisoned").len()
    }
}
