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

//! DELETE executor
//!
//! Two phases: scan, lock and validate victims into a temporary buffer,
//! then remove them from the row store. Materializing the victim set
//! before mutating avoids cursor stability issues when the scan uses an
//! index the delete would invalidate.

use std::sync::Arc;

use crate::core::{Action, Result, ResultOption, Row, RowId};
use crate::storage::expression::Expression;
use crate::storage::traits::{LockMode, RowStore};

use super::collector::DeltaCollector;
use super::evaluator::ScalarExpr;
use super::resolve_fetch;
use super::scan::TableFilter;
use super::session::{Right, Session};

/// Cancellation poll interval in the apply phase
const APPLY_CANCEL_INTERVAL: usize = 128;

/// A prepared DELETE statement
pub struct Delete {
    session: Arc<Session>,
    filter: TableFilter,
    fetch: Option<ScalarExpr>,
    prepared: bool,
}

impl Delete {
    /// Create a DELETE over a table
    pub fn new(session: Arc<Session>, table: Arc<dyn RowStore>) -> Self {
        Self {
            session,
            filter: TableFilter::new(table, None),
            fetch: None,
            prepared: false,
        }
    }

    /// Set the WHERE condition
    pub fn set_condition(&mut self, condition: Box<dyn Expression>) {
        self.filter.set_condition(Some(condition));
    }

    /// Set the FETCH FIRST n ROWS ONLY clause
    pub fn set_fetch(&mut self, fetch: ScalarExpr) {
        self.fetch = Some(fetch);
    }

    /// The target table
    pub fn table(&self) -> &Arc<dyn RowStore> {
        self.filter.table()
    }

    /// The owning session
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Resolve the condition against the table schema; idempotent
    pub fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        self.filter.prepare()?;
        if let Some(fetch) = &mut self.fetch {
            fetch.prepare(self.filter.table().schema())?;
        }
        self.prepared = true;
        Ok(())
    }

    /// Execute, reporting every row event to the collector.
    ///
    /// Returns the number of deleted rows. Rows vetoed by a BEFORE row
    /// trigger stay in the store and are not counted, but their
    /// `(DELETE, OLD)` event has already been delivered.
    pub fn update(&mut self, collector: &mut DeltaCollector) -> Result<u64> {
        self.prepare()?;
        let result = self.run(collector);
        let session = self.session.clone();
        self.filter.table().release_session_locks(&session);
        result
    }

    fn run(&mut self, collector: &mut DeltaCollector) -> Result<u64> {
        let session = self.session.clone();
        let table = self.filter.table().clone();
        self.filter.start_query();

        session.check_table_right(table.name(), Right::Delete)?;
        if table.triggers().fire_statement(&session, Action::Delete, true) {
            return Ok(0);
        }
        table.lock_table(&session, LockMode::Write)?;
        let limit = resolve_fetch(&self.fetch)?;

        // phase one: collect and lock the victim set
        let mut rows: Vec<(RowId, Row)> = Vec::new();
        let mut count = 0u64;
        while self.filter.next_row(&session, limit, count)? {
            let Some((ptr, row)) = self.filter.lock_and_recheck(&session)? else {
                continue;
            };
            collector.trigger(Action::Delete, ResultOption::Old, row.as_slice())?;
            if table.triggers().fire_row(Action::Delete)
                && table
                    .triggers()
                    .fire_before_row(&session, Action::Delete, Some(&row), None)
            {
                table.unlock_row(&session, ptr);
                continue;
            }
            rows.push((ptr, row));
            count += 1;
        }

        // phase two: remove the buffered victims; cancellation is polled
        // at phase entry and every 128 rows
        for (scanned, (ptr, _)) in rows.iter().enumerate() {
            if scanned % APPLY_CANCEL_INTERVAL == 0 {
                session.check_cancelled()?;
            }
            table.remove_row(&session, *ptr)?;
        }
        if table.triggers().fire_row(Action::Delete) {
            session.check_cancelled()?;
            for (_, row) in &rows {
                table
                    .triggers()
                    .fire_after_row(&session, Action::Delete, Some(row), None, false);
            }
        }
        table.triggers().fire_statement(&session, Action::Delete, false);
        Ok(count)
    }
}
