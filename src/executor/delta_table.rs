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

//! Data change delta table
//!
//! Wraps a data change statement as a read-only virtual table: querying it
//! executes the statement and yields its OLD, NEW or FINAL rows, shaped
//! like the target table.

use std::sync::Arc;

use crate::core::{Result, ResultOption};

use super::collector::data_change_delta_table_collector;
use super::command::DataChangeStatement;
use super::result::{sink, take_sink, LocalResult};
use super::session::Session;

/// A virtual table producing the OLD/NEW/FINAL rows of a mutation
pub struct DataChangeDeltaTable {
    statement: DataChangeStatement,
    option: ResultOption,
}

impl DataChangeDeltaTable {
    /// Wrap a statement; `option` selects which lifecycle snapshot the
    /// table exposes
    pub fn new(statement: DataChangeStatement, option: ResultOption) -> Self {
        Self { statement, option }
    }

    /// The snapshot this table exposes
    pub fn option(&self) -> ResultOption {
        self.option
    }

    /// A name for plans and error messages, e.g. `NEW TABLE (UPDATE)`
    pub fn name(&self) -> String {
        format!(
            "{} TABLE ({})",
            self.option.as_str(),
            self.statement.statement_name()
        )
    }

    /// Execute the wrapped statement and return the matching delta rows.
    ///
    /// The result has the target table's columns. Executing twice re-runs
    /// the statement, like any query over a non-deterministic table.
    pub fn get_result(&mut self, session: &Arc<Session>) -> Result<LocalResult> {
        self.statement.prepare()?;
        let result = LocalResult::for_table(self.statement.table().schema());
        let delta_sink = sink(result);
        let mut collector = data_change_delta_table_collector(
            session,
            self.statement.table().as_ref(),
            delta_sink.clone(),
            self.option,
        );
        self.statement.update(&mut collector)?;
        Ok(take_sink(&delta_sink))
    }
}
