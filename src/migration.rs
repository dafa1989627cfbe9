//! Precondition / migrate / verify / rollback sequencing.
//!
//! The orchestrator does not catch errors from its callbacks. A callback
//! returning `Err` stops the sequence where it is, the error goes straight
//! back to the caller, and the completion callback is not invoked.

use std::cell::RefCell;
use std::fmt;

use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::QueryError;

/// Where a [`Migration`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationState {
    Idle,
    CheckingPreconditions,
    Migrating,
    Verifying,
    Done,
    RollingBack,
    Complete,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MigrationState::Idle => "idle",
            MigrationState::CheckingPreconditions => "checking preconditions",
            MigrationState::Migrating => "migrating",
            MigrationState::Verifying => "verifying",
            MigrationState::Done => "done",
            MigrationState::RollingBack => "rolling back",
            MigrationState::Complete => "complete",
        })
    }
}

type Check<'a, E> = Box<dyn FnMut() -> Result<bool, E> + 'a>;
type Action<'a, E> = Box<dyn FnMut() -> Result<(), E> + 'a>;

/// One migration attempt: the four steps plus the state they leave behind.
pub struct Migration<'a, E = anyhow::Error> {
    precondition: Check<'a, E>,
    migrate: Action<'a, E>,
    verify: Check<'a, E>,
    rollback: Action<'a, E>,
    state: MigrationState,
    outcome: Option<bool>,
}

impl<'a, E> Migration<'a, E> {
    pub fn new(
        precondition: impl FnMut() -> Result<bool, E> + 'a,
        migrate: impl FnMut() -> Result<(), E> + 'a,
        verify: impl FnMut() -> Result<bool, E> + 'a,
        rollback: impl FnMut() -> Result<(), E> + 'a,
    ) -> Self {
        Self {
            precondition: Box::new(precondition),
            migrate: Box::new(migrate),
            verify: Box::new(verify),
            rollback: Box::new(rollback),
            state: MigrationState::Idle,
            outcome: None,
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// `Some(success)` once the run reached [`MigrationState::Complete`].
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    /// Runs the sequence and returns whether the migration succeeded.
    ///
    /// A false precondition skips every other step. A false verification
    /// triggers the rollback, whose own success is not checked; the run is
    /// reported as failed either way. `on_complete` is called exactly once
    /// on both of those paths and on success, but not when a step errors.
    pub fn run(&mut self, on_complete: impl FnOnce(bool)) -> Result<bool, E> {
        self.outcome = None;

        self.transition(MigrationState::CheckingPreconditions);
        if !(self.precondition)()? {
            debug!("migration preconditions not met");
            return Ok(self.finish(false, on_complete));
        }

        self.transition(MigrationState::Migrating);
        (self.migrate)()?;

        self.transition(MigrationState::Verifying);
        if (self.verify)()? {
            self.transition(MigrationState::Done);
            return Ok(self.finish(true, on_complete));
        }

        self.transition(MigrationState::RollingBack);
        warn!("migration verification failed, rolling back");
        (self.rollback)()?;
        Ok(self.finish(false, on_complete))
    }

    fn transition(&mut self, next: MigrationState) {
        debug!(from = %self.state, to = %next, "migration state change");
        self.state = next;
    }

    fn finish(&mut self, success: bool, on_complete: impl FnOnce(bool)) -> bool {
        self.transition(MigrationState::Complete);
        self.outcome = Some(success);
        info!(success, "migration complete");
        on_complete(success);
        success
    }
}

/// Runs one migration attempt. See [`Migration::run`].
pub fn run_migration<E>(
    precondition: impl FnMut() -> Result<bool, E>,
    migrate: impl FnMut() -> Result<(), E>,
    verify: impl FnMut() -> Result<bool, E>,
    rollback: impl FnMut() -> Result<(), E>,
    on_complete: impl FnOnce(bool),
) -> Result<bool, E> {
    Migration::new(precondition, migrate, verify, rollback).run(on_complete)
}

impl Connection {
    /// Upgrades the schema to `target` when the stored version is lower.
    ///
    /// `script` and the version bump run in one transaction. `verify` is
    /// called inside that transaction; the transaction commits only when it
    /// returns true and is rolled back otherwise. An error in any step drops
    /// the transaction, which rolls it back as well.
    pub fn upgrade(
        &self,
        target: i32,
        script: &str,
        mut verify: impl FnMut(&Connection) -> Result<bool, QueryError>,
        on_complete: impl FnOnce(bool),
    ) -> Result<bool, QueryError> {
        if self.mode().is_read_only() {
            return Err(QueryError::ReadOnlyViolation);
        }

        let pending: RefCell<Option<rusqlite::Transaction<'_>>> = RefCell::new(None);
        let mut migration: Migration<'_, QueryError> = Migration::new(
            || Ok(self.version()? < target),
            || {
                let tx = self.raw().unchecked_transaction()?;
                tx.execute_batch(script)?;
                tx.pragma_update(None, "user_version", target)?;
                *pending.borrow_mut() = Some(tx);
                Ok(())
            },
            || {
                if self.version()? != target || !verify(self)? {
                    return Ok(false);
                }
                if let Some(tx) = pending.borrow_mut().take() {
                    tx.commit()?;
                }
                Ok(true)
            },
            || {
                if let Some(tx) = pending.borrow_mut().take() {
                    tx.rollback()?;
                }
                Ok(())
            },
        );
        let upgraded = migration.run(on_complete)?;
        if upgraded {
            info!(path = %self.path().display(), version = target, "schema upgraded");
        }
        Ok(upgraded)
    }
}
