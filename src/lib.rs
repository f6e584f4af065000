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

//! # Rowforge - DML execution core
//!
//! Rowforge is the row-mutation heart of a relational engine: it executes
//! prepared DELETE, UPDATE, INSERT and MERGE statements against a row
//! store while coordinating triggers, constraints, locking, and result
//! projection.
//!
//! ## Key Features
//!
//! - **Two-phase execution** - scan + lock + validate into a buffer, then
//!   mutate, preserving transactional safety under concurrent writers
//! - **Delta collectors** - composable observers notified of every row
//!   change at OLD/NEW/FINAL lifecycle points
//! - **Trigger semantics** - BEFORE/AFTER, statement/row, with veto
//! - **Lock-and-recheck** - per-row write locks re-validate candidates to
//!   close the read-modify-write gap without table-wide locking
//! - **Result projection** - generated keys (ALL / indexes / names),
//!   RETURNING, and OLD/NEW/FINAL delta tables
//! - **Cancellation** - polled at bulk-scan granularity with lock-wait
//!   timeouts
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use rowforge::core::{DataType, SchemaBuilder, Value};
//! use rowforge::executor::{default_collector, Delete, Session};
//! use rowforge::storage::{seed_rows, ComparisonExpr, MemTable};
//!
//! let table = MemTable::new(
//!     SchemaBuilder::new("t")
//!         .add_primary_key("a", DataType::Integer)
//!         .add("b", DataType::Integer)
//!         .build(),
//! );
//! let session = Arc::new(Session::new());
//! seed_rows(&table, &session, vec![
//!     vec![Value::integer(1), Value::integer(10)],
//!     vec![Value::integer(2), Value::integer(20)],
//! ]).unwrap();
//!
//! let table: Arc<dyn rowforge::storage::RowStore> = Arc::new(table);
//! let mut delete = Delete::new(session.clone(), table.clone());
//! delete.set_condition(Box::new(ComparisonExpr::gte("b", Value::integer(20))));
//! let mut collector = default_collector(&session, table.as_ref());
//! assert_eq!(delete.update(&mut collector).unwrap(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`DataType`], [`Value`], [`Row`], [`Schema`], [`Error`])
//! - [`storage`] - RowStore contract, predicate expressions, in-memory store
//! - [`executor`] - Statement executors, collectors, triggers, sessions
//! - [`common`] - Boundary string helpers and process-wide caches

pub mod common;
pub mod core;
pub mod executor;
pub mod storage;

// Re-export main types for convenience
pub use core::{
    Action, ColumnCheck, ColumnDefault, DataType, Error, Operator, Result, ResultOption, Row,
    RowId, Schema, SchemaBuilder, SchemaColumn, Value,
};

// Re-export storage types
pub use storage::{
    AndExpr, ComparisonExpr, ConstBoolExpr, Expression, LockMode, MemTable, NotExpr,
    NullCheckExpr, OrExpr, RowStore, Scanner, VecScanner,
};

// Re-export executor types
pub use executor::{
    CommandContainer, DataChangeDeltaTable, DataChangeStatement, Delete, DeltaCollector,
    GeneratedKeysRequest, Insert, InsertSource, LocalResult, Merge, ResultSink, ResultTarget,
    ResultWithGeneratedKeys, Right, ScalarExpr, Session, SessionMode, SetClauseList, TableFilter,
    TriggerSet, Update,
};
