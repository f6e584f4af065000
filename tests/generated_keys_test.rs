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

//! Generated Keys Tests
//!
//! Tests the command container's request resolution: ALL, 1-based
//! indexes, names with the case-resolution chain, empty projections, and
//! the DELETE exclusion.

use std::sync::Arc;

use rowforge::executor::{
    CommandContainer, DataChangeStatement, GeneratedKeysRequest, Insert, InsertSource, ScalarExpr,
    Session, SessionMode,
};
use rowforge::storage::{MemTable, RowStore};
use rowforge::{ColumnDefault, DataType, Delete, Error, SchemaBuilder, Value};

fn keyed_table() -> Arc<dyn RowStore> {
    Arc::new(MemTable::new(
        SchemaBuilder::new("K")
            .add_identity("ID", DataType::Integer)
            .add("NAME", DataType::Text)
            .add_with_default("STAMP", DataType::Timestamp, ColumnDefault::CurrentTimestamp)
            .add_with_default("FLAG", DataType::Boolean, ColumnDefault::Constant(Value::boolean(false)))
            .add_nullable("MixedCase", DataType::Integer)
            .build(),
    ))
}

fn insert_one(session: &Arc<Session>, table: &Arc<dyn RowStore>) -> DataChangeStatement {
    DataChangeStatement::Insert(Insert::new(
        session.clone(),
        table.clone(),
        vec!["NAME".to_string()],
        InsertSource::Values(vec![vec![ScalarExpr::literal(Value::text("x"))]]),
    ))
}

/// ALL selects identity, primary key members and non-constant defaults,
/// not constant defaults
#[test]
fn test_request_all_interesting_columns() {
    let table = keyed_table();
    let session = Arc::new(Session::new());
    let mut command = CommandContainer::new(insert_one(&session, &table));
    let result = command
        .execute_update(GeneratedKeysRequest::All)
        .expect("Failed to execute");
    assert_eq!(result.count(), 1);
    let keys = result.keys().expect("keys requested");
    assert_eq!(keys.column_names(), &["ID".to_string(), "STAMP".to_string()]);
    assert_eq!(keys.rows().len(), 1);
    assert_eq!(keys.rows()[0][0], Value::integer(1));
}

/// Explicit 1-based indexes project in request order
#[test]
fn test_request_indexes() {
    let table = keyed_table();
    let session = Arc::new(Session::new());
    let mut command = CommandContainer::new(insert_one(&session, &table));
    let result = command
        .execute_update(GeneratedKeysRequest::Indexes(vec![2, 1]))
        .expect("Failed to execute");
    let keys = result.keys().expect("keys requested");
    assert_eq!(keys.column_names(), &["NAME".to_string(), "ID".to_string()]);
    assert_eq!(keys.rows()[0][0], Value::text("x"));
    assert_eq!(keys.rows()[0][1], Value::integer(1));
}

/// An index outside [1, column count] is a column-not-found error
#[test]
fn test_request_index_out_of_range() {
    let table = keyed_table();
    let session = Arc::new(Session::new());

    for bad in [0usize, 9] {
        let mut command = CommandContainer::new(insert_one(&session, &table));
        let err = command
            .execute_update(GeneratedKeysRequest::Indexes(vec![bad]))
            .unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(_)), "index {}", bad);
    }
}

/// Names resolve exactly, then through the database casing mode, then
/// case-insensitively
#[test]
fn test_request_names_case_chain() {
    let table = keyed_table();
    // database_to_upper (the default) maps lowercase requests onto the
    // upper-cased stored names
    let session = Arc::new(Session::new());
    let mut command = CommandContainer::new(insert_one(&session, &table));
    let result = command
        .execute_update(GeneratedKeysRequest::Names(vec![
            "ID".to_string(),        // exact
            "name".to_string(),      // via the upper-cased variant
            "mixedcase".to_string(), // case-insensitive fallback
        ]))
        .expect("Failed to execute");
    let keys = result.keys().expect("keys requested");
    assert_eq!(
        keys.column_names(),
        &[
            "ID".to_string(),
            "NAME".to_string(),
            "MixedCase".to_string()
        ]
    );
}

/// An unresolvable name is a column-not-found error
#[test]
fn test_request_unknown_name() {
    let table = keyed_table();
    let session = Arc::new(Session::new());
    let mut command = CommandContainer::new(insert_one(&session, &table));
    let err = command
        .execute_update(GeneratedKeysRequest::Names(vec!["nope".to_string()]))
        .unwrap_err();
    assert_eq!(err, Error::ColumnNotFound("nope".to_string()));
}

/// A table with nothing interesting yields an empty result, not a failure
#[test]
fn test_request_all_with_empty_projection() {
    let table: Arc<dyn RowStore> = Arc::new(MemTable::new(
        SchemaBuilder::new("plain").add("v", DataType::Integer).build(),
    ));
    let session = Arc::new(Session::new());
    let mut command = CommandContainer::new(DataChangeStatement::Insert(Insert::new(
        session.clone(),
        table.clone(),
        Vec::new(),
        InsertSource::Values(vec![vec![ScalarExpr::literal(Value::integer(1))]]),
    )));
    let result = command
        .execute_update(GeneratedKeysRequest::All)
        .expect("Failed to execute");
    assert_eq!(result.count(), 1);
    let keys = result.keys().expect("keys requested");
    assert_eq!(keys.column_count(), 0);
    assert!(keys.is_empty());
}

/// DELETE statements never produce generated keys
#[test]
fn test_delete_yields_empty_keys() {
    let table = keyed_table();
    let session = Arc::new(Session::new());

    // put a row in first
    let mut command = CommandContainer::new(insert_one(&session, &table));
    command
        .execute_update(GeneratedKeysRequest::None)
        .expect("Failed to insert");

    let mut command = CommandContainer::new(DataChangeStatement::Delete(Delete::new(
        session.clone(),
        table.clone(),
    )));
    let result = command
        .execute_update(GeneratedKeysRequest::All)
        .expect("Failed to delete");
    assert_eq!(result.count(), 1);
    let keys = result.keys().expect("request was honored with a result");
    assert!(keys.is_empty());
    assert_eq!(keys.column_count(), 0);
}

/// With no request, only the count comes back
#[test]
fn test_request_none() {
    let table = keyed_table();
    let session = Arc::new(Session::new());
    let mut command = CommandContainer::new(insert_one(&session, &table));
    let result = command
        .execute_update(GeneratedKeysRequest::None)
        .expect("Failed to execute");
    assert_eq!(result.count(), 1);
    assert!(result.keys().is_none());
}

/// With identity capture disabled the session value stays untouched
#[test]
fn test_no_identity_capture_when_mode_disabled() {
    let table = keyed_table();
    let session = Arc::new(Session::with_mode(SessionMode {
        take_inserted_identity: false,
        ..SessionMode::default()
    }));
    let mut command = CommandContainer::new(insert_one(&session, &table));
    command
        .execute_update(GeneratedKeysRequest::All)
        .expect("Failed to execute");
    assert!(session.last_identity().is_null());
}
