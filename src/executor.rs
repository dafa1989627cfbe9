//! Statement execution with bind, row and completion callbacks.
//!
//! A statement is prepared fresh for every execution and dropped (finalized)
//! before the call returns, whichever way it returns.

use rusqlite::{Row, Statement, ToSql};
use tracing::debug;

use crate::connection::Connection;
use crate::error::QueryError;
use crate::value::{parameter_name, Params, Value};

pub(crate) type BindFn<'a> = dyn FnMut(&mut Binder<'_, '_>) -> Result<(), QueryError> + 'a;
pub(crate) type RowFn<'a> = dyn FnMut(&Row<'_>, usize) -> Result<(), QueryError> + 'a;
pub(crate) type CompleteFn<'a> = dyn FnOnce() + 'a;

/// The optional callbacks driving one execution.
///
/// ```no_run
/// # use sqlite_query_util::{Callbacks, Connection, OpenMode};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Connection::open("app.db", OpenMode::ReadOnly)?;
/// let mut names = Vec::new();
/// conn.query(
///     "SELECT name FROM users WHERE age > ?",
///     Callbacks::new()
///         .bind(|b| b.push(30))
///         .on_row(|row, _| {
///             names.push(row.get::<_, String>(0)?);
///             Ok(())
///         }),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Callbacks<'a> {
    pub(crate) bind: Option<Box<BindFn<'a>>>,
    pub(crate) row: Option<Box<RowFn<'a>>>,
    pub(crate) complete: Option<Box<CompleteFn<'a>>>,
}

impl<'a> Callbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds parameters on the prepared statement. Runs once per prepare,
    /// before the first step, so it must be safe to call again for every
    /// page of an enumeration.
    pub fn bind<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Binder<'_, '_>) -> Result<(), QueryError> + 'a,
    {
        self.bind = Some(Box::new(f));
        self
    }

    /// Called for every result row with the row and its zero-based index.
    /// Returning an error stops the execution and surfaces that error.
    pub fn on_row<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Row<'_>, usize) -> Result<(), QueryError> + 'a,
    {
        self.row = Some(Box::new(f));
        self
    }

    /// Called once after the last row, even when no rows were produced.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + 'a,
    {
        self.complete = Some(Box::new(f));
        self
    }

    pub(crate) fn complete(&mut self) {
        if let Some(complete) = self.complete.take() {
            complete();
        }
    }
}

/// Parameter binding on a prepared statement.
///
/// Tracks which placeholders were bound so the executor can refuse a
/// statement whose placeholders were not all filled.
pub struct Binder<'s, 'c> {
    stmt: &'s mut Statement<'c>,
    bound: Vec<bool>,
    next: usize,
}

impl<'s, 'c> Binder<'s, 'c> {
    fn new(stmt: &'s mut Statement<'c>) -> Self {
        let expected = stmt.parameter_count();
        Self {
            stmt,
            bound: vec![false; expected],
            next: 1,
        }
    }

    /// Number of placeholders the statement declares.
    pub fn expected(&self) -> usize {
        self.bound.len()
    }

    /// Number of distinct placeholders bound so far.
    pub fn bound(&self) -> usize {
        self.bound.iter().filter(|b| **b).count()
    }

    /// Binds the next positional placeholder, in the order they appear.
    pub fn push(&mut self, value: impl ToSql) -> Result<(), QueryError> {
        let index = self.next;
        self.bind(index, value)
    }

    /// Binds the placeholder at the 1-based `index`.
    pub fn bind(&mut self, index: usize, value: impl ToSql) -> Result<(), QueryError> {
        if index == 0 || index > self.expected() {
            return Err(QueryError::ParameterMismatch {
                expected: self.expected(),
                bound: index,
            });
        }
        self.stmt.raw_bind_parameter(index, value)?;
        self.bound[index - 1] = true;
        self.next = index + 1;
        Ok(())
    }

    /// Binds a named placeholder such as `:id`. A bare name gets a `:`.
    pub fn bind_named(&mut self, name: &str, value: impl ToSql) -> Result<(), QueryError> {
        let name = parameter_name(name);
        let index = self
            .stmt
            .parameter_index(&name)?
            .ok_or_else(|| QueryError::UnknownParameter(name.into_owned()))?;
        self.bind(index, value)
    }

    /// Binds every entry of `params` by name.
    pub fn bind_params(&mut self, params: &Params) -> Result<(), QueryError> {
        for (name, value) in &params.values {
            self.bind_named(name, value)?;
        }
        Ok(())
    }

    /// Binds `values` positionally, starting at the first placeholder.
    pub fn bind_values(&mut self, values: &[Value]) -> Result<(), QueryError> {
        for (i, value) in values.iter().enumerate() {
            self.bind(i + 1, value)?;
        }
        Ok(())
    }
}

/// Whether an execution may modify the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    ReadWrite,
}

impl Connection {
    /// Runs a read/write statement.
    ///
    /// Fails with [`QueryError::ReadOnlyViolation`] when the statement may
    /// write and this connection was opened read-only; the statement is
    /// rejected before it is stepped.
    pub fn execute(&self, sql: &str, mut callbacks: Callbacks<'_>) -> Result<(), QueryError> {
        self.step_statement(
            sql,
            Access::ReadWrite,
            callbacks.bind.as_deref_mut(),
            callbacks.row.as_deref_mut(),
            0,
        )?;
        callbacks.complete();
        Ok(())
    }

    /// Runs a statement that must not modify the database, whatever mode
    /// the connection was opened in.
    pub fn query(&self, sql: &str, mut callbacks: Callbacks<'_>) -> Result<(), QueryError> {
        self.step_statement(
            sql,
            Access::Read,
            callbacks.bind.as_deref_mut(),
            callbacks.row.as_deref_mut(),
            0,
        )?;
        callbacks.complete();
        Ok(())
    }

    /// Runs a batch of semicolon-separated statements without parameters or
    /// result rows, e.g. DDL or an explicit `BEGIN ... COMMIT`.
    ///
    /// On a read-only connection the engine itself refuses any statement
    /// that writes, which surfaces as [`QueryError::ReadOnlyViolation`].
    pub fn execute_script(&self, sql: &str) -> Result<(), QueryError> {
        debug!(path = %self.path().display(), "executing sql script");
        self.raw().execute_batch(sql)?;
        Ok(())
    }

    /// Prepares, binds and steps `sql`, numbering rows from `first_row`.
    /// Returns the number of rows produced.
    pub(crate) fn step_statement(
        &self,
        sql: &str,
        access: Access,
        bind: Option<&mut BindFn<'_>>,
        mut on_row: Option<&mut RowFn<'_>>,
        first_row: usize,
    ) -> Result<usize, QueryError> {
        let mut stmt = self.raw().prepare(sql).map_err(QueryError::prepare)?;

        let writes = !stmt.readonly();
        if writes && (access == Access::Read || self.mode().is_read_only()) {
            return Err(QueryError::ReadOnlyViolation);
        }

        let expected = stmt.parameter_count();
        let bound = match bind {
            Some(bind) => {
                let mut binder = Binder::new(&mut stmt);
                bind(&mut binder)?;
                binder.bound()
            }
            None => 0,
        };
        if bound != expected {
            return Err(QueryError::ParameterMismatch { expected, bound });
        }

        debug!(sql, first_row, "stepping statement");
        let mut rows = stmt.raw_query();
        let mut index = first_row;
        while let Some(row) = rows.next()? {
            if let Some(on_row) = on_row.as_deref_mut() {
                on_row(row, index)?;
            }
            index += 1;
        }
        Ok(index - first_row)
    }
}
