//! Limit/offset enumeration over large result sets.

use tracing::debug;

use crate::connection::Connection;
use crate::error::QueryError;
use crate::executor::{Access, Callbacks, RowFn};

impl Connection {
    /// Walks the rows of `base_query` one page of `page_size` rows at a
    /// time, so only one page is held by the engine at once.
    ///
    /// `count_query` runs first and the first column of its first row is
    /// taken as the total number of rows; a negative total counts as zero. When it is zero the completion callback fires and
    /// `base_query` is never issued. Otherwise each page appends
    /// `LIMIT page_size OFFSET n * page_size` to `base_query` (which must not
    /// paginate itself; a trailing `;` is dropped) until the offset reaches
    /// the total.
    ///
    /// The bind callback runs once per page, and once more for the count
    /// query if it declares placeholders. Row indices keep counting across
    /// pages. The completion callback fires once, after the last page.
    ///
    /// The total is not re-checked between pages: rows inserted or deleted
    /// concurrently may be skipped or missed. Wrap the call in a transaction
    /// when a consistent snapshot is needed.
    pub fn enumerate(
        &self,
        base_query: &str,
        count_query: &str,
        page_size: usize,
        mut callbacks: Callbacks<'_>,
    ) -> Result<(), QueryError> {
        if page_size == 0 {
            return Err(QueryError::InvalidPageSize);
        }

        let total = self.count_rows(count_query, &mut callbacks)?;
        debug!(total, page_size, "enumerating rows");

        let base = base_query.trim_end().trim_end_matches(';').trim_end();
        // SQLite reads integer literals past i64::MAX as REAL.
        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
        let mut offset: usize = 0;
        let mut delivered = 0;
        while offset < total {
            debug!(offset, limit, "fetching page");
            let skip = i64::try_from(offset).unwrap_or(i64::MAX);
            // On its own line so a trailing `--` comment cannot swallow it.
            let sql = format!("{base}\nLIMIT {limit} OFFSET {skip}");
            delivered += self.step_statement(
                &sql,
                Access::Read,
                callbacks.bind.as_deref_mut(),
                callbacks.row.as_deref_mut(),
                delivered,
            )?;
            offset = offset.saturating_add(page_size);
        }

        callbacks.complete();
        Ok(())
    }

    fn count_rows(
        &self,
        count_query: &str,
        callbacks: &mut Callbacks<'_>,
    ) -> Result<usize, QueryError> {
        let takes_params = self
            .raw()
            .prepare(count_query)
            .map_err(QueryError::prepare)?
            .parameter_count()
            > 0;
        let bind = if takes_params {
            callbacks.bind.as_deref_mut()
        } else {
            None
        };

        let mut total: i64 = 0;
        let mut read_count = |row: &rusqlite::Row<'_>, index: usize| -> Result<(), QueryError> {
            if index == 0 {
                total = row.get(0)?;
            }
            Ok(())
        };
        self.step_statement(
            count_query,
            Access::Read,
            bind,
            Some(&mut read_count as &mut RowFn<'_>),
            0,
        )?;
        if total <= 0 {
            return Ok(0);
        }
        Ok(usize::try_from(total).unwrap_or(usize::MAX))
    }
}
