//! Time-boxed single-table read cache: one slot holding `(rows, loaded_at)`
//! behind a mutex with a fixed TTL. Callers invalidate on every write to the
//! cached table.

use anyhow::Result;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct TableCache<T> {
    ttl: Duration,
    slot: Mutex<Option<Slot<T>>>,
}

struct Slot<T> {
    rows: Arc<Vec<T>>,
    loaded_at: Instant,
}

impl<T> TableCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached rows when still fresh, otherwise run `load` and
    /// cache its result. A failed load leaves the slot untouched.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<Vec<T>>>
    where
        F: FnOnce() -> Result<Vec<T>>,
    {
        let mut slot = self.slot.lock().expect("cache mutex poisoned");
        if let Some(cached) = slot.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.rows));
            }
        }

        let rows = Arc::new(load()?);
        *slot = Some(Slot {
            rows: Arc::clone(&rows),
            loaded_at: Instant::now(),
        });
        Ok(rows)
    }

    /// Drop the cached slot unconditionally. Called after any write to the
    /// underlying table.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().expect("cache mutex poisoned");
        *slot = None;
    }
}
