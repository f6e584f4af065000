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

//! Filtered scan driver and lock-and-recheck
//!
//! The planned scan may read through an index without serializable
//! guarantees, so a candidate row is only trusted after its write lock is
//! re-acquired and the predicate re-evaluated against the re-read values.
//! This closes the read-modify-write gap without a table-wide lock.

use std::sync::Arc;

use crate::core::{Result, Row, RowId};
use crate::storage::expression::Expression;
use crate::storage::traits::RowStore;

use super::session::Session;

/// Cancellation is polled once per this many scanned rows
const CANCEL_CHECK_INTERVAL: u64 = 128;

/// Drives the target table's planned row source with fetch-limit and
/// cancellation, and re-validates candidates under their row lock
pub struct TableFilter {
    table: Arc<dyn RowStore>,
    condition: Option<Box<dyn Expression>>,
    plan: Vec<RowId>,
    cursor: usize,
    current: Option<RowId>,
    scanned: u64,
}

impl TableFilter {
    /// Create a filter over a table with an optional WHERE condition
    pub fn new(table: Arc<dyn RowStore>, condition: Option<Box<dyn Expression>>) -> Self {
        Self {
            table,
            condition,
            plan: Vec::new(),
            cursor: 0,
            current: None,
            scanned: 0,
        }
    }

    /// The target table
    pub fn table(&self) -> &Arc<dyn RowStore> {
        &self.table
    }

    /// Replace the WHERE condition (before prepare)
    pub fn set_condition(&mut self, condition: Option<Box<dyn Expression>>) {
        self.condition = condition;
    }

    /// Resolve the condition against the table schema
    pub fn prepare(&mut self) -> Result<()> {
        if let Some(condition) = &mut self.condition {
            if !condition.is_prepared() {
                condition.prepare_for_schema(self.table.schema())?;
            }
        }
        Ok(())
    }

    /// Capture the planned row source for this execution
    pub fn start_query(&mut self) {
        self.plan = self.table.plan_scan();
        self.reset();
    }

    /// Rewind to before the first candidate
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.current = None;
        self.scanned = 0;
    }

    /// Advance to the next candidate row.
    ///
    /// Halts when the source is exhausted or when a non-negative `limit`
    /// has been reached by `count`. Polls the session's cancellation flag
    /// every 128 rows.
    pub fn next_row(&mut self, session: &Session, limit: i64, count: u64) -> Result<bool> {
        if limit >= 0 && count >= limit as u64 {
            return Ok(false);
        }
        while self.cursor < self.plan.len() {
            let ptr = self.plan[self.cursor];
            self.cursor += 1;
            self.scanned += 1;
            if self.scanned % CANCEL_CHECK_INTERVAL == 0 {
                session.check_cancelled()?;
            }
            // an unlocked read; the candidate is re-validated under lock
            let Some(row) = self.table.read_row(ptr) else {
                continue;
            };
            if let Some(condition) = &self.condition {
                if !condition.evaluate(&row)? {
                    continue;
                }
            }
            self.current = Some(ptr);
            return Ok(true);
        }
        self.current = None;
        Ok(false)
    }

    /// Lock the current candidate and re-check the predicate.
    ///
    /// Returns the re-read row with its write lock held, or None when the
    /// row vanished or no longer matches (the lock is released again).
    /// A lock wait exceeding the session timeout raises `LockTimeout`.
    pub fn lock_and_recheck(&mut self, session: &Session) -> Result<Option<(RowId, Row)>> {
        let ptr = self
            .current
            .ok_or_else(|| crate::core::Error::internal("lock_and_recheck before next_row"))?;
        self.table.lock_row(session, ptr)?;
        let Some(row) = self.table.read_row(ptr) else {
            // deleted by a concurrent transaction between scan and lock
            self.table.unlock_row(session, ptr);
            return Ok(None);
        };
        if let Some(condition) = &self.condition {
            if !condition.evaluate(&row)? {
                self.table.unlock_row(session, ptr);
                return Ok(None);
            }
        }
        Ok(Some((ptr, row)))
    }
}
