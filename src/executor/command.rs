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

//! Statement container and the generated-keys projector
//!
//! [`CommandContainer`] owns its prepared statement (the statement carries
//! no back-pointer). It resolves the caller's generated-keys request into
//! a column-ordinal vector and pairs the update count with the projected
//! key rows. DELETE statements never produce generated keys.

use smallvec::SmallVec;

use crate::common::strings::{to_lower_english, to_upper_english};
use crate::core::{Error, Result};
use crate::storage::traits::RowStore;

use super::collector::{default_collector, generated_keys_collector, DeltaCollector};
use super::delete::Delete;
use super::insert::{Insert, Merge};
use super::result::{sink, take_sink, LocalResult};
use super::session::Session;
use super::update::Update;

/// A row-changing statement of any kind
pub enum DataChangeStatement {
    Delete(Delete),
    Update(Update),
    Insert(Insert),
    Merge(Merge),
}

impl DataChangeStatement {
    /// Resolve columns, conditions and plans; idempotent
    pub fn prepare(&mut self) -> Result<()> {
        match self {
            DataChangeStatement::Delete(stmt) => stmt.prepare(),
            DataChangeStatement::Update(stmt) => stmt.prepare(),
            DataChangeStatement::Insert(stmt) => stmt.prepare(),
            DataChangeStatement::Merge(stmt) => stmt.prepare(),
        }
    }

    /// Execute with the given collector; returns the affected row count
    pub fn update(&mut self, collector: &mut DeltaCollector) -> Result<u64> {
        match self {
            DataChangeStatement::Delete(stmt) => stmt.update(collector),
            DataChangeStatement::Update(stmt) => stmt.update(collector),
            DataChangeStatement::Insert(stmt) => stmt.update(collector),
            DataChangeStatement::Merge(stmt) => stmt.update(collector),
        }
    }

    /// Execute with the default collector
    pub fn update_default(&mut self) -> Result<u64> {
        let mut collector = default_collector(self.session(), self.table().as_ref());
        self.update(&mut collector)
    }

    /// The target table
    pub fn table(&self) -> &std::sync::Arc<dyn RowStore> {
        match self {
            DataChangeStatement::Delete(stmt) => stmt.table(),
            DataChangeStatement::Update(stmt) => stmt.table(),
            DataChangeStatement::Insert(stmt) => stmt.table(),
            DataChangeStatement::Merge(stmt) => stmt.table(),
        }
    }

    /// The owning session
    pub fn session(&self) -> &std::sync::Arc<Session> {
        match self {
            DataChangeStatement::Delete(stmt) => stmt.session(),
            DataChangeStatement::Update(stmt) => stmt.session(),
            DataChangeStatement::Insert(stmt) => stmt.session(),
            DataChangeStatement::Merge(stmt) => stmt.session(),
        }
    }

    /// The SQL keyword naming this statement
    pub fn statement_name(&self) -> &'static str {
        match self {
            DataChangeStatement::Delete(_) => "DELETE",
            DataChangeStatement::Update(_) => "UPDATE",
            DataChangeStatement::Insert(_) => "INSERT",
            DataChangeStatement::Merge(_) => "MERGE",
        }
    }

    fn is_delete(&self) -> bool {
        matches!(self, DataChangeStatement::Delete(_))
    }
}

/// The caller's request for generated keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedKeysRequest {
    /// No keys requested; the caller only wants the count
    None,

    /// All interesting columns: identity, primary-key members, and
    /// non-constant default columns
    All,

    /// Explicit 1-based column indexes
    Indexes(Vec<usize>),

    /// Column names, resolved case-sensitively first, then against the
    /// database's upper/lower-cased variants, then case-insensitively
    Names(Vec<String>),
}

/// An update count paired with the projected generated-key rows
#[derive(Debug)]
pub struct ResultWithGeneratedKeys {
    count: u64,
    keys: Option<LocalResult>,
}

impl ResultWithGeneratedKeys {
    /// The affected row count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The generated-key rows, when any were requested
    pub fn keys(&self) -> Option<&LocalResult> {
        self.keys.as_ref()
    }

    /// Take the generated-key rows out of the result
    pub fn into_keys(self) -> Option<LocalResult> {
        self.keys
    }
}

/// Wraps a prepared statement for execution
pub struct CommandContainer {
    statement: DataChangeStatement,
}

impl CommandContainer {
    /// Take ownership of a prepared statement
    pub fn new(statement: DataChangeStatement) -> Self {
        Self { statement }
    }

    /// The wrapped statement
    pub fn statement(&self) -> &DataChangeStatement {
        &self.statement
    }

    /// Execute the statement, honoring the generated-keys request
    pub fn execute_update(
        &mut self,
        request: GeneratedKeysRequest,
    ) -> Result<ResultWithGeneratedKeys> {
        self.statement.prepare()?;
        if request == GeneratedKeysRequest::None {
            return Ok(ResultWithGeneratedKeys {
                count: self.statement.update_default()?,
                keys: None,
            });
        }
        if self.statement.is_delete() {
            // deleted rows generate no keys; honor the request shape with
            // an empty result
            return Ok(ResultWithGeneratedKeys {
                count: self.statement.update_default()?,
                keys: Some(LocalResult::new(Vec::new())),
            });
        }

        let session = self.statement.session().clone();
        let indexes =
            resolve_generated_keys_request(&session, self.statement.table().as_ref(), &request)?;
        if indexes.is_empty() {
            return Ok(ResultWithGeneratedKeys {
                count: self.statement.update_default()?,
                keys: Some(LocalResult::new(Vec::new())),
            });
        }

        let schema = self.statement.table().schema();
        let column_names = indexes
            .iter()
            .map(|&i| schema.columns[i].name.clone())
            .collect();
        let keys_sink = sink(LocalResult::new(column_names));
        let mut collector = generated_keys_collector(
            self.statement.session(),
            self.statement.table().as_ref(),
            indexes,
            keys_sink.clone(),
        );
        let count = self.statement.update(&mut collector)?;
        Ok(ResultWithGeneratedKeys {
            count,
            keys: Some(take_sink(&keys_sink)),
        })
    }
}

/// Resolve a generated-keys request into a column-ordinal vector
fn resolve_generated_keys_request(
    session: &Session,
    table: &dyn RowStore,
    request: &GeneratedKeysRequest,
) -> Result<SmallVec<[usize; 4]>> {
    let schema = table.schema();
    let column_count = schema.column_count();
    match request {
        GeneratedKeysRequest::None => Err(Error::internal(
            "generated keys requested with an empty request",
        )),
        GeneratedKeysRequest::All => Ok(schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| {
                column.identity
                    || column.primary_key
                    || column
                        .default
                        .as_ref()
                        .map(|d| !d.is_constant())
                        .unwrap_or(false)
            })
            .map(|(i, _)| i)
            .collect()),
        GeneratedKeysRequest::Indexes(indexes) => indexes
            .iter()
            .map(|&index| {
                if index < 1 || index > column_count {
                    Err(Error::ColumnNotFound(format!("Index: {}", index)))
                } else {
                    Ok(index - 1)
                }
            })
            .collect(),
        GeneratedKeysRequest::Names(names) => names
            .iter()
            .map(|name| resolve_column_name(session, table, name))
            .collect(),
    }
}

/// Resolve one generated-keys column name: exact match first, then the
/// upper- or lower-cased variant per the database casing mode, then
/// case-insensitively
fn resolve_column_name(session: &Session, table: &dyn RowStore, name: &str) -> Result<usize> {
    let schema = table.schema();
    if let Some(index) = schema.find_column(name) {
        return Ok(index);
    }
    let mode = session.mode();
    let recased = if mode.database_to_upper {
        schema.find_column(&to_upper_english(name))
    } else if mode.database_to_lower {
        schema.find_column(&to_lower_english(name))
    } else {
        None
    };
    if let Some(index) = recased {
        return Ok(index);
    }
    schema
        .find_column_ignore_case(name)
        .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
}
