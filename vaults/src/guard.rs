//! Re-entrancy entry guard.
//!
//! The hosting model serializes calls, but a collaborator invoked
//! mid-call can legally re-invoke the vault before returning. The books
//! are only ever mutated while holding an [`EntryPermit`]; a re-entrant
//! call that reaches a mutation section while one is already open is
//! refused outright.
//!
//! The permit is RAII: it releases on every exit path, early return and
//! panic included, so no failure mode can leave the vault wedged shut.

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// A mutation section was entered while another was already open.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("re-entrant call rejected")]
pub struct ReentrantEntry;

/// The per-vault in-progress marker.
#[derive(Debug, Default)]
pub struct EntryFlag {
    locked: AtomicBool,
}

impl EntryFlag {
    /// Creates a released flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a mutation section.
    ///
    /// # Errors
    ///
    /// Returns [`ReentrantEntry`] if a section is already open.
    pub fn enter(&self) -> Result<EntryPermit<'_>, ReentrantEntry> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(ReentrantEntry);
        }
        Ok(EntryPermit { flag: self })
    }
}

/// An open mutation section. Dropping it closes the section.
#[must_use = "dropping the permit immediately reopens the vault"]
#[derive(Debug)]
pub struct EntryPermit<'a> {
    flag: &'a EntryFlag,
}

impl Drop for EntryPermit<'_> {
    fn drop(&mut self) {
        self.flag.locked.store(false, Ordering::Release);
    }
}
