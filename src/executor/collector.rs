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

//! Delta collectors: observers of every row-change event
//!
//! Executors report each mutated row at well-defined lifecycle points
//! (OLD, NEW, FINAL) by calling `trigger` on the statement's collector.
//! Collectors never mutate the values they observe and never extend row
//! lifetime; they project into their own sinks or session state.
//!
//! For each user-visible mutated row the event sequence is one of:
//! `(DELETE, OLD)`, `(INSERT, NEW) (INSERT, FINAL)`, or
//! `(UPDATE, OLD) (UPDATE, NEW) (UPDATE, FINAL)`.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::core::{Action, Result, ResultOption, Value};
use crate::storage::traits::RowStore;

use super::evaluator::ScalarExpr;
use super::result::{ResultSink, ResultTarget};
use super::session::Session;

/// An observer of row-change events
///
/// Variants are composed at construction time; dispatch order of a
/// composite equals construction order with no short-circuit.
pub enum DeltaCollector {
    /// Ignores all events
    Noop,

    /// On `(INSERT, FINAL)`, copies the identity column value into the
    /// session as "last inserted identity"
    LastIdentity {
        session: Arc<Session>,
        identity_column: usize,
    },

    /// On FINAL events, projects the values through an index vector into
    /// a result sink
    GeneratedKeys {
        indexes: SmallVec<[usize; 4]>,
        sink: ResultSink,
    },

    /// Records the values into a result sink when the event's option
    /// matches the configured one
    DataChangeDeltaTable {
        option: ResultOption,
        sink: ResultSink,
    },

    /// Records a row derived from a fixed expression list, on
    /// `(DELETE, OLD)` and `(INSERT|UPDATE, FINAL)`
    Returning {
        expressions: Vec<ScalarExpr>,
        sink: ResultSink,
    },

    /// Deterministic fan-out to an ordered list of child collectors
    Composite(Vec<DeltaCollector>),
}

impl DeltaCollector {
    /// Observe one row-change event
    pub fn trigger(
        &mut self,
        action: Action,
        option: ResultOption,
        values: &[Value],
    ) -> Result<()> {
        match self {
            DeltaCollector::Noop => Ok(()),
            DeltaCollector::LastIdentity {
                session,
                identity_column,
            } => {
                if action == Action::Insert && option == ResultOption::Final {
                    session.set_last_identity(values[*identity_column].clone());
                }
                Ok(())
            }
            DeltaCollector::GeneratedKeys { indexes, sink } => {
                if option == ResultOption::Final {
                    let row: Vec<Value> =
                        indexes.iter().map(|&i| values[i].clone()).collect();
                    sink.lock().add_row(&row);
                }
                Ok(())
            }
            DeltaCollector::DataChangeDeltaTable { option: wanted, sink } => {
                if option == *wanted {
                    sink.lock().add_row(values);
                }
                Ok(())
            }
            DeltaCollector::Returning { expressions, sink } => {
                let collects = match (action, option) {
                    (Action::Delete, ResultOption::Old) => true,
                    (Action::Insert | Action::Update, ResultOption::Final) => true,
                    _ => false,
                };
                if collects {
                    let mut row = Vec::with_capacity(expressions.len());
                    for expr in expressions.iter() {
                        row.push(expr.evaluate(values)?);
                    }
                    sink.lock().add_row(&row);
                }
                Ok(())
            }
            DeltaCollector::Composite(children) => {
                for child in children.iter_mut() {
                    child.trigger(action, option, values)?;
                }
                Ok(())
            }
        }
    }
}

/// The collector used when the caller requested nothing beyond the count
pub fn default_collector(session: &Arc<Session>, table: &dyn RowStore) -> DeltaCollector {
    enrich_with_last_identity(session, table, DeltaCollector::Noop)
}

/// Collector feeding an OLD/NEW/FINAL delta table result
pub fn data_change_delta_table_collector(
    session: &Arc<Session>,
    table: &dyn RowStore,
    sink: ResultSink,
    option: ResultOption,
) -> DeltaCollector {
    enrich_with_last_identity(
        session,
        table,
        DeltaCollector::DataChangeDeltaTable { option, sink },
    )
}

/// Collector projecting generated key columns into a sink
pub fn generated_keys_collector(
    session: &Arc<Session>,
    table: &dyn RowStore,
    indexes: impl IntoIterator<Item = usize>,
    sink: ResultSink,
) -> DeltaCollector {
    enrich_with_last_identity(
        session,
        table,
        DeltaCollector::GeneratedKeys {
            indexes: indexes.into_iter().collect(),
            sink,
        },
    )
}

/// Collector evaluating a RETURNING expression list
pub fn returning_collector(
    session: &Arc<Session>,
    table: &dyn RowStore,
    expressions: Vec<ScalarExpr>,
    sink: ResultSink,
) -> DeltaCollector {
    enrich_with_last_identity(
        session,
        table,
        DeltaCollector::Returning { expressions, sink },
    )
}

/// Wrap a collector with identity capture when the session mode asks for
/// it and the table has an identity column. LastIdentity runs first so
/// `session.last_identity` is already updated when a user sink fires.
fn enrich_with_last_identity(
    session: &Arc<Session>,
    table: &dyn RowStore,
    delegate: DeltaCollector,
) -> DeltaCollector {
    let identity_column = if session.mode().take_inserted_identity {
        table.schema().identity_column()
    } else {
        None
    };
    match identity_column {
        Some(identity_column) => DeltaCollector::Composite(vec![
            DeltaCollector::LastIdentity {
                session: session.clone(),
                identity_column,
            },
            delegate,
        ]),
        None => delegate,
    }
}
