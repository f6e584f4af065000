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

//! Statement execution
//!
//! This module implements execution of row-changing statements:
//! - DELETE
//! - UPDATE (with the SET-clause engine and ON DUPLICATE KEY fallback)
//! - INSERT / MERGE
//!
//! All executors share the same two-phase pattern: scan, lock and validate
//! candidates into a statement-local buffer, then mutate the row store.
//! Every row change is reported to the statement's [`DeltaCollector`] at
//! its OLD/NEW/FINAL lifecycle points.

pub mod collector;
pub mod command;
pub mod delete;
pub mod delta_table;
pub mod evaluator;
pub mod insert;
pub mod result;
pub mod scan;
pub mod session;
pub mod triggers;
pub mod update;

pub use collector::{
    data_change_delta_table_collector, default_collector, generated_keys_collector,
    returning_collector, DeltaCollector,
};
pub use command::{
    CommandContainer, DataChangeStatement, GeneratedKeysRequest, ResultWithGeneratedKeys,
};
pub use delete::Delete;
pub use delta_table::DataChangeDeltaTable;
pub use evaluator::{ArithOp, ScalarExpr};
pub use insert::{Insert, InsertSource, Merge};
pub use result::{sink, take_sink, LocalResult, ResultSink, ResultTarget};
pub use scan::TableFilter;
pub use session::{Right, Session, SessionMode};
pub use triggers::TriggerSet;
pub use update::{SetClauseList, Update};

use crate::core::{Error, Result};

/// Resolve an optional FETCH clause to a row limit.
///
/// Absent means unlimited (-1); a NULL or negative value is invalid.
pub(crate) fn resolve_fetch(fetch: &Option<ScalarExpr>) -> Result<i64> {
    let Some(fetch) = fetch else {
        return Ok(-1);
    };
    let value = fetch.evaluate(&[])?;
    if value.is_null() {
        return Err(Error::invalid_value("FETCH", "NULL"));
    }
    let limit = value
        .as_int64()
        .ok_or_else(|| Error::invalid_value("FETCH", value.to_string()))?;
    if limit < 0 {
        return Err(Error::invalid_value("FETCH", limit.to_string()));
    }
    Ok(limit)
}
