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

//! INSERT and MERGE executors
//!
//! Source rows come from an eager VALUES list or a streamed row source.
//! Each row is built from column defaults plus the provided values, gets
//! its identity assigned from the table sequence when left unset, and is
//! observed as `(INSERT, NEW)` before triggers and `(INSERT, FINAL)`
//! after the store accepted it.
//!
//! When an ON DUPLICATE KEY set list is present (that is MERGE's matched
//! arm), a source row whose key already exists is routed through the
//! UPDATE path before any insert lifecycle event fires; without one a key
//! conflict surfaces as an integrity violation.

use std::sync::Arc;

use crate::core::{Action, Error, Result, ResultOption, Row};
use crate::storage::traits::{LockMode, RowStore, Scanner};

use super::collector::DeltaCollector;
use super::evaluator::ScalarExpr;
use super::session::{Right, Session};
use super::update::SetClauseList;

/// Cancellation poll interval over the source rows
const SOURCE_CANCEL_INTERVAL: u64 = 128;

/// Where the rows to insert come from
pub enum InsertSource {
    /// Eager VALUES lists, one expression vector per row
    Values(Vec<Vec<ScalarExpr>>),

    /// A streamed sub-query result
    Query(Box<dyn Scanner>),
}

/// A prepared INSERT statement
pub struct Insert {
    session: Arc<Session>,
    table: Arc<dyn RowStore>,
    columns: Vec<String>,
    column_indices: Vec<usize>,
    source: InsertSource,
    on_duplicate: Option<SetClauseList>,
    prepared: bool,
}

impl Insert {
    /// Create an INSERT over a table. An empty column list targets all
    /// columns in ordinal order.
    pub fn new(
        session: Arc<Session>,
        table: Arc<dyn RowStore>,
        columns: Vec<String>,
        source: InsertSource,
    ) -> Self {
        Self {
            session,
            table,
            columns,
            column_indices: Vec::new(),
            source,
            on_duplicate: None,
            prepared: false,
        }
    }

    /// Attach the ON DUPLICATE KEY UPDATE assignment list
    pub fn set_on_duplicate(&mut self, set_clause_list: SetClauseList) {
        self.on_duplicate = Some(set_clause_list);
    }

    /// The target table
    pub fn table(&self) -> &Arc<dyn RowStore> {
        &self.table
    }

    /// The owning session
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Resolve target columns and expressions; idempotent
    pub fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        let schema = self.table.schema();
        self.column_indices = if self.columns.is_empty() {
            (0..schema.column_count()).collect()
        } else {
            self.columns
                .iter()
                .map(|name| {
                    schema
                        .find_column_ignore_case(name)
                        .ok_or_else(|| Error::ColumnNotFound(name.clone()))
                })
                .collect::<Result<Vec<_>>>()?
        };
        if let InsertSource::Values(rows) = &mut self.source {
            let schema = self.table.schema();
            for row in rows {
                for expr in row {
                    expr.prepare(schema)?;
                }
            }
        }
        if let Some(set_clause_list) = &mut self.on_duplicate {
            set_clause_list.prepare(self.table.schema())?;
        }
        self.prepared = true;
        Ok(())
    }

    /// Execute, reporting every row event to the collector.
    ///
    /// Returns the number of rows inserted plus rows updated through the
    /// ON DUPLICATE KEY path.
    pub fn update(&mut self, collector: &mut DeltaCollector) -> Result<u64> {
        self.prepare()?;
        let mut source = std::mem::replace(&mut self.source, InsertSource::Values(Vec::new()));
        let result = self.run(&mut source, collector);
        // a streamed source is drained; a VALUES list survives re-execution
        self.source = source;
        self.table.release_session_locks(&self.session);
        result
    }

    fn run(&mut self, source: &mut InsertSource, collector: &mut DeltaCollector) -> Result<u64> {
        let session = self.session.clone();
        let table = self.table.clone();

        session.check_table_right(table.name(), Right::Insert)?;
        if table.triggers().fire_statement(&session, Action::Insert, true) {
            return Ok(0);
        }
        table.lock_table(&session, LockMode::Write)?;

        let mut count = 0u64;
        let mut row_number = 0u64;
        match source {
            InsertSource::Values(rows) => {
                for value_row in rows.iter() {
                    row_number += 1;
                    if row_number % SOURCE_CANCEL_INTERVAL == 0 {
                        session.check_cancelled()?;
                    }
                    if value_row.len() != self.column_indices.len() {
                        return Err(Error::invalid_value(
                            "VALUES",
                            format!(
                                "{} expressions for {} columns",
                                value_row.len(),
                                self.column_indices.len()
                            ),
                        ));
                    }
                    let mut values = Vec::with_capacity(self.column_indices.len());
                    for expr in value_row {
                        values.push(match expr {
                            ScalarExpr::Default => None,
                            other => Some(other.evaluate(&[])?),
                        });
                    }
                    count += self.insert_row(&session, collector, values)? as u64;
                }
            }
            InsertSource::Query(scanner) => {
                while scanner.next() {
                    row_number += 1;
                    if row_number % SOURCE_CANCEL_INTERVAL == 0 {
                        session.check_cancelled()?;
                    }
                    let source_row = scanner.take_row();
                    if source_row.len() != self.column_indices.len() {
                        return Err(Error::invalid_value(
                            "INSERT",
                            format!(
                                "select returns {} columns for {} insert columns",
                                source_row.len(),
                                self.column_indices.len()
                            ),
                        ));
                    }
                    let values = source_row.into_values().into_iter().map(Some).collect();
                    count += self.insert_row(&session, collector, values)? as u64;
                }
                if let Some(err) = scanner.err() {
                    return Err(err.clone());
                }
            }
        }

        table.triggers().fire_statement(&session, Action::Insert, false);
        Ok(count)
    }

    /// Build, observe and store one row; returns whether it counted
    fn insert_row(
        &self,
        session: &Session,
        collector: &mut DeltaCollector,
        provided: Vec<Option<crate::core::Value>>,
    ) -> Result<bool> {
        let table = &self.table;
        let schema = table.schema();

        // expand defaults, then overlay the provided values
        let mut row = Row::with_capacity(schema.column_count());
        for column in &schema.columns {
            row.push(match &column.default {
                Some(default) => default.evaluate().into_coerce_to_type(column.data_type),
                None => crate::core::Value::null(column.data_type),
            });
        }
        for (provided, &index) in provided.into_iter().zip(self.column_indices.iter()) {
            // a DEFAULT marker keeps the pre-initialized default
            let Some(value) = provided else { continue };
            let column = &schema.columns[index];
            let was_null = value.is_null();
            let coerced = value.into_coerce_to_type(column.data_type);
            if coerced.is_null() && !was_null {
                return Err(Error::invalid_value(
                    column.name.clone(),
                    format!("cannot convert to {}", column.data_type),
                ));
            }
            row.set(index, coerced)?;
        }

        // assign identity for identity columns left unset
        if let Some(identity_column) = schema.identity_column() {
            if row[identity_column].is_null() {
                row.set(
                    identity_column,
                    crate::core::Value::Integer(table.next_identity()),
                )?;
            }
        }

        // a matched key routes through the UPDATE path before any insert
        // lifecycle event fires; collectors see only the UPDATE triple and
        // INSERT row triggers stay silent for it
        if let Some(set_clause_list) = &self.on_duplicate {
            if let Some(existing) = table.find_row_by_key(&row) {
                table.lock_row(session, existing)?;
                match table.read_row(existing) {
                    Some(current) => {
                        return set_clause_list.apply_to_row(
                            session,
                            table.as_ref(),
                            collector,
                            existing,
                            current,
                            true,
                        );
                    }
                    None => {
                        // vanished under us; the insert proceeds
                        table.unlock_row(session, existing);
                    }
                }
            }
        }

        collector.trigger(Action::Insert, ResultOption::New, row.as_slice())?;

        if table.triggers().fire_row(Action::Insert)
            && table
                .triggers()
                .fire_before_row(session, Action::Insert, None, Some(&mut row))
        {
            return Ok(false);
        }

        // the table write lock is held; a key conflict surviving the
        // pre-check above is a genuine integrity violation
        table.add_row(session, row.clone())?;
        collector.trigger(Action::Insert, ResultOption::Final, row.as_slice())?;
        if table.triggers().fire_row(Action::Insert) {
            table
                .triggers()
                .fire_after_row(session, Action::Insert, None, Some(&row), false);
        }
        Ok(true)
    }
}

/// A prepared MERGE statement
///
/// Source rows are matched against the target's key; a match routes
/// through the UPDATE path with the given assignment list, a miss through
/// INSERT. Collectors see `(UPDATE, OLD/NEW/FINAL)` or
/// `(INSERT, NEW/FINAL)` per source row accordingly.
pub struct Merge {
    insert: Insert,
}

impl Merge {
    /// Create a MERGE over a table
    pub fn new(
        session: Arc<Session>,
        table: Arc<dyn RowStore>,
        columns: Vec<String>,
        source: InsertSource,
        set_clause_list: SetClauseList,
    ) -> Self {
        let mut insert = Insert::new(session, table, columns, source);
        insert.set_on_duplicate(set_clause_list);
        Self { insert }
    }

    /// The target table
    pub fn table(&self) -> &Arc<dyn RowStore> {
        self.insert.table()
    }

    /// The owning session
    pub fn session(&self) -> &Arc<Session> {
        self.insert.session()
    }

    /// Resolve columns and expressions; idempotent
    pub fn prepare(&mut self) -> Result<()> {
        self.insert.prepare()
    }

    /// Execute; needs both INSERT and UPDATE rights on the target
    pub fn update(&mut self, collector: &mut DeltaCollector) -> Result<u64> {
        let session = self.insert.session().clone();
        session.check_table_right(self.insert.table().name(), Right::Update)?;
        self.insert.update(collector)
    }
}
