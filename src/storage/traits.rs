// Copyright 2025 Rowforge Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RowStore and Scanner traits
//!
//! The execution core mutates state owned by a row store. Executors reach
//! the store only through [`RowStore`]: scan planning, row reads, table and
//! per-row write locks, and the three mutation entry points. Triggers hang
//! off the store's table descriptor.

use crate::core::{Result, Row, RowId, Schema};
use crate::executor::session::Session;
use crate::executor::triggers::TriggerSet;

/// Table lock modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared lock held while planning
    Read,
    /// Exclusive lock held while mutating
    Write,
}

/// A table inside the row store, as seen by the execution core
pub trait RowStore: Send + Sync {
    /// Table name
    fn name(&self) -> &str;

    /// Table descriptor
    fn schema(&self) -> &Schema;

    /// Triggers registered on this table
    fn triggers(&self) -> &TriggerSet;

    /// Draw the next value from the table's identity sequence
    fn next_identity(&self) -> i64;

    /// Capture the planned row source: the pointers of all live rows in
    /// scan order. The snapshot tolerates concurrent change; the
    /// lock-and-recheck step re-validates each candidate.
    fn plan_scan(&self) -> Vec<RowId>;

    /// Re-read the current bytes at a row pointer; None if the row has
    /// been deleted
    fn read_row(&self, ptr: RowId) -> Option<Row>;

    /// Find the live row whose primary key equals `row`'s. None when the
    /// table has no primary key or any key value is NULL. MERGE uses this
    /// to route matched source rows through the UPDATE path.
    fn find_row_by_key(&self, row: &Row) -> Option<RowId>;

    // =========================================================================
    // Locking
    // =========================================================================

    /// Acquire the table lock, waiting up to the session's lock timeout
    fn lock_table(&self, session: &Session, mode: LockMode) -> Result<()>;

    /// Acquire a row's write lock, waiting up to the session's lock timeout
    fn lock_row(&self, session: &Session, ptr: RowId) -> Result<()>;

    /// Release a row's write lock if this session holds it
    fn unlock_row(&self, session: &Session, ptr: RowId);

    /// Release every table and row lock this session holds
    fn release_session_locks(&self, session: &Session);

    // =========================================================================
    // Mutation (caller holds the table WRITE lock)
    // =========================================================================

    /// Insert a row; returns its pointer. A primary key conflict is a
    /// `DuplicateKey` error carrying the existing row's pointer.
    fn add_row(&self, session: &Session, row: Row) -> Result<RowId>;

    /// Remove a row by pointer
    fn remove_row(&self, session: &Session, ptr: RowId) -> Result<()>;

    /// Replace a row's values in place
    fn update_row(&self, session: &Session, ptr: RowId, new_row: Row) -> Result<()>;
}

/// Scanner provides an iterator over rows, used for streamed INSERT sources
///
/// Follows an iterator pattern where `next()` advances to the next row and
/// `row()` returns the current row.
pub trait Scanner: Send {
    /// Advance to the next row; false when exhausted or on error
    fn next(&mut self) -> bool;

    /// The current row; valid until the next call to `next()`
    fn row(&self) -> &Row;

    /// Any error that stopped iteration
    fn err(&self) -> Option<&crate::core::Error>;

    /// Takes ownership of the current row (avoids clone)
    fn take_row(&mut self) -> Row {
        self.row().clone()
    }
}

/// A scanner over a vector of rows
pub struct VecScanner {
    rows: std::vec::IntoIter<Row>,
    current: Row,
}

impl VecScanner {
    /// Create a scanner over the given rows
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
            current: Row::new(),
        }
    }
}

impl Scanner for VecScanner {
    fn next(&mut self) -> bool {
        match self.rows.next() {
            Some(row) => {
                self.current = row;
                true
            }
            None => {
                self.current = Row::new();
                false
            }
        }
    }

    fn row(&self) -> &Row {
        &self.current
    }

    fn err(&self) -> Option<&crate::core::Error> {
        None
    }

    fn take_row(&mut self) -> Row {
        std::mem::take(&mut self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_vec_scanner() {
        let rows = vec![
            Row::from_values(vec![Value::integer(1)]),
            Row::from_values(vec![Value::integer(2)]),
        ];
        let mut scanner = VecScanner::new(rows);
        assert!(scanner.next());
        assert_eq!(scanner.row()[0], Value::integer(1));
        assert!(scanner.next());
        assert_eq!(scanner.take_row()[0], Value::integer(2));
        assert!(!scanner.next());
        assert!(scanner.err().is_none());
    }
}
