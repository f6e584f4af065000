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

//! UPDATE executor and the SET-clause engine
//!
//! Shares the DELETE shell: scan, lock and validate into a buffer of
//! (old, new) pairs, then apply. The SET-clause engine computes the new
//! row from the locked old row, enforces column constraints, detects
//! no-op updates, and feeds OLD/NEW events; FINAL events follow each
//! successful write in the apply phase.
//!
//! When this UPDATE is the fallback path of an ON DUPLICATE KEY INSERT,
//! per-row constraint violations are reported as "row skipped" instead of
//! aborting the statement.

use std::sync::Arc;

use crate::core::{Action, Error, Result, ResultOption, Row, RowId};
use crate::storage::expression::Expression;
use crate::storage::traits::{LockMode, RowStore};

use super::collector::DeltaCollector;
use super::evaluator::ScalarExpr;
use super::resolve_fetch;
use super::scan::TableFilter;
use super::session::{Right, Session};

/// Cancellation poll interval in the apply phase
const APPLY_CANCEL_INTERVAL: usize = 128;

/// Buffered (pointer, old row, new row) triple awaiting apply
type UpdateEntry = (RowId, Row, Row);

struct SetClause {
    column: String,
    index: Option<usize>,
    expr: ScalarExpr,
}

/// The list of SET assignments of an UPDATE statement
#[derive(Default)]
pub struct SetClauseList {
    clauses: Vec<SetClause>,
}

impl SetClauseList {
    /// Create an empty assignment list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an assignment `column = expr`; expressions may read OLD columns
    pub fn set(mut self, column: impl Into<String>, expr: ScalarExpr) -> Self {
        self.clauses.push(SetClause {
            column: column.into(),
            index: None,
            expr,
        });
        self
    }

    /// Whether the list holds no assignments
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Resolve assignment targets and expressions against the schema
    pub fn prepare(&mut self, schema: &crate::core::Schema) -> Result<()> {
        for clause in &mut self.clauses {
            let index = schema
                .column_index_map()
                .get(&clause.column.to_lowercase())
                .copied()
                .ok_or_else(|| Error::ColumnNotFound(clause.column.clone()))?;
            clause.index = Some(index);
            clause.expr.prepare(schema)?;
        }
        Ok(())
    }

    /// Compute and validate the new row for one locked old row.
    ///
    /// Emits `(UPDATE, OLD)` and `(UPDATE, NEW)` and buffers the pair
    /// unless the row turns out to be a no-op, is vetoed by a BEFORE row
    /// trigger, or (in ON DUPLICATE KEY fallback mode) fails a constraint.
    /// Returns whether the row was buffered and is to be counted.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn prepare_update(
        &self,
        table: &dyn RowStore,
        session: &Session,
        collector: &mut DeltaCollector,
        buffer: &mut Vec<UpdateEntry>,
        ptr: RowId,
        row: Row,
        on_duplicate_fallback: bool,
    ) -> Result<bool> {
        let mut new_row = row.clone();
        match self.assign_and_validate(table, &row, &mut new_row) {
            Ok(()) => {}
            Err(err)
                if on_duplicate_fallback
                    && (err.is_integrity_violation()
                        || matches!(
                            err,
                            Error::InvalidValue { .. } | Error::TypeConversion { .. }
                        )) =>
            {
                return Ok(false);
            }
            Err(err) => return Err(err),
        }

        if new_row == row {
            // no-op update: no events, no count
            return Ok(false);
        }

        collector.trigger(Action::Update, ResultOption::Old, row.as_slice())?;
        collector.trigger(Action::Update, ResultOption::New, new_row.as_slice())?;

        if table.triggers().fire_row(Action::Update)
            && table
                .triggers()
                .fire_before_row(session, Action::Update, Some(&row), Some(&mut new_row))
        {
            return Ok(false);
        }

        buffer.push((ptr, row, new_row));
        Ok(true)
    }

    fn assign_and_validate(
        &self,
        table: &dyn RowStore,
        old_row: &Row,
        new_row: &mut Row,
    ) -> Result<()> {
        let schema = table.schema();
        for clause in &self.clauses {
            let index = clause
                .index
                .ok_or_else(|| Error::internal("set clause not prepared"))?;
            let column = &schema.columns[index];
            let value = clause.expr.evaluate(old_row.as_slice())?;
            let was_null = value.is_null();
            let coerced = value.into_coerce_to_type(column.data_type);
            if coerced.is_null() && !was_null {
                return Err(Error::invalid_value(
                    column.name.clone(),
                    format!("cannot convert to {}", column.data_type),
                ));
            }
            new_row.set(index, coerced)?;
        }
        for column in &schema.columns {
            let value = &new_row[column.id];
            if value.is_null() && !column.nullable {
                return Err(Error::not_null_constraint(column.name.clone()));
            }
            if let Some(check) = &column.check {
                if !check.holds(value) {
                    return Err(Error::check_constraint(column.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Apply the buffered pairs, emitting `(UPDATE, FINAL)` after each
    /// successful write, then fire AFTER row triggers.
    ///
    /// Constraint violations surfaced here are final; there is no
    /// ON DUPLICATE KEY retry at this stage.
    pub(crate) fn do_update(
        &self,
        session: &Session,
        table: &dyn RowStore,
        collector: &mut DeltaCollector,
        buffer: &[UpdateEntry],
    ) -> Result<()> {
        // cancellation is polled at phase entry and every 128 rows
        for (scanned, (ptr, _, new_row)) in buffer.iter().enumerate() {
            if scanned % APPLY_CANCEL_INTERVAL == 0 {
                session.check_cancelled()?;
            }
            table.update_row(session, *ptr, new_row.clone())?;
            collector.trigger(Action::Update, ResultOption::Final, new_row.as_slice())?;
        }
        if table.triggers().fire_row(Action::Update) {
            session.check_cancelled()?;
            for (_, old_row, new_row) in buffer {
                table.triggers().fire_after_row(
                    session,
                    Action::Update,
                    Some(old_row),
                    Some(new_row),
                    false,
                );
            }
        }
        Ok(())
    }

    /// Run the full prepare-and-apply cycle for a single locked row;
    /// used by the MERGE / ON DUPLICATE KEY path.
    pub(crate) fn apply_to_row(
        &self,
        session: &Session,
        table: &dyn RowStore,
        collector: &mut DeltaCollector,
        ptr: RowId,
        row: Row,
        on_duplicate_fallback: bool,
    ) -> Result<bool> {
        let mut buffer = Vec::with_capacity(1);
        if !self.prepare_update(
            table,
            session,
            collector,
            &mut buffer,
            ptr,
            row,
            on_duplicate_fallback,
        )? {
            return Ok(false);
        }
        self.do_update(session, table, collector, &buffer)?;
        Ok(true)
    }
}

/// A prepared UPDATE statement
pub struct Update {
    session: Arc<Session>,
    filter: TableFilter,
    set_clause_list: SetClauseList,
    fetch: Option<ScalarExpr>,
    on_duplicate_fallback: bool,
    prepared: bool,
}

impl Update {
    /// Create an UPDATE over a table
    pub fn new(
        session: Arc<Session>,
        table: Arc<dyn RowStore>,
        set_clause_list: SetClauseList,
    ) -> Self {
        Self {
            session,
            filter: TableFilter::new(table, None),
            set_clause_list,
            fetch: None,
            on_duplicate_fallback: false,
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

    /// Mark this UPDATE as the fallback path of an ON DUPLICATE KEY INSERT
    pub fn set_on_duplicate_fallback(&mut self, fallback: bool) {
        self.on_duplicate_fallback = fallback;
    }

    /// The target table
    pub fn table(&self) -> &Arc<dyn RowStore> {
        self.filter.table()
    }

    /// The owning session
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Resolve columns and expressions; idempotent
    pub fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        self.filter.prepare()?;
        let schema = self.filter.table().schema().clone();
        self.set_clause_list.prepare(&schema)?;
        if let Some(fetch) = &mut self.fetch {
            fetch.prepare(&schema)?;
        }
        self.prepared = true;
        Ok(())
    }

    /// Execute, reporting every row event to the collector.
    ///
    /// Returns the number of updated rows; no-op rows (new == old per
    /// column) are neither counted nor observed by collectors.
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

        session.check_table_right(table.name(), Right::Update)?;
        if table.triggers().fire_statement(&session, Action::Update, true) {
            return Ok(0);
        }
        table.lock_table(&session, LockMode::Write)?;
        let limit = resolve_fetch(&self.fetch)?;

        // get the old rows, compute the new rows
        let mut rows: Vec<UpdateEntry> = Vec::new();
        let mut count = 0u64;
        while self.filter.next_row(&session, limit, count)? {
            let Some((ptr, row)) = self.filter.lock_and_recheck(&session)? else {
                continue;
            };
            if self.set_clause_list.prepare_update(
                table.as_ref(),
                &session,
                collector,
                &mut rows,
                ptr,
                row,
                self.on_duplicate_fallback,
            )? {
                count += 1;
            }
        }

        self.set_clause_list
            .do_update(&session, table.as_ref(), collector, &rows)?;
        table.triggers().fire_statement(&session, Action::Update, false);
        Ok(count)
    }
}
