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

//! INSERT / MERGE Executor Tests
//!
//! Tests identity assignment, default expansion, generated-keys capture,
//! streamed sources, and MERGE routing through the insert or update arm.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rowforge::executor::{
    default_collector, generated_keys_collector, sink, DeltaCollector, Insert, InsertSource,
    LocalResult, Merge, Right, ScalarExpr, Session, SetClauseList,
};
use rowforge::storage::{seed_rows, MemTable, RowStore, VecScanner};
use rowforge::{
    Action, ColumnDefault, DataType, Error, ResultOption, Row, SchemaBuilder, Value,
};

fn identity_fixture() -> (Arc<MemTable>, Arc<dyn RowStore>, Arc<Session>) {
    let table = Arc::new(MemTable::new(
        SchemaBuilder::new("i")
            .add_identity("id", DataType::Integer)
            .add("v", DataType::Integer)
            .build(),
    ));
    let session = Arc::new(Session::new());
    let store: Arc<dyn RowStore> = table.clone();
    (table, store, session)
}

fn values(rows: Vec<Vec<Value>>) -> InsertSource {
    InsertSource::Values(
        rows.into_iter()
            .map(|row| row.into_iter().map(ScalarExpr::literal).collect())
            .collect(),
    )
}

/// Scenario: INSERT INTO i(v) VALUES (7),(8) with a GeneratedKeys
/// collector selecting {id}; identity values are sequential and
/// session.last_identity equals the second of them
#[test]
fn test_insert_generated_keys_and_last_identity() {
    let (mem, table, session) = identity_fixture();
    let mut insert = Insert::new(
        session.clone(),
        table.clone(),
        vec!["v".to_string()],
        values(vec![vec![Value::integer(7)], vec![Value::integer(8)]]),
    );

    let keys_sink = sink(LocalResult::new(vec!["id".to_string()]));
    let mut collector =
        generated_keys_collector(&session, table.as_ref(), [0], keys_sink.clone());
    let count = insert.update(&mut collector).expect("Failed to insert");
    assert_eq!(count, 2);

    let keys = keys_sink.lock();
    assert_eq!(keys.rows().len(), 2);
    let first = keys.rows()[0][0].as_int64().unwrap();
    let second = keys.rows()[1][0].as_int64().unwrap();
    assert_eq!(second, first + 1);
    assert_eq!(session.last_identity(), Value::integer(second));
    assert_eq!(mem.row_count(), 2);
}

/// Explicit identity values are kept; only NULL draws from the sequence
#[test]
fn test_insert_explicit_identity_kept() {
    let (mem, table, session) = identity_fixture();
    let mut insert = Insert::new(
        session.clone(),
        table.clone(),
        Vec::new(),
        values(vec![vec![Value::integer(50), Value::integer(1)]]),
    );
    let mut collector = default_collector(&session, table.as_ref());
    assert_eq!(insert.update(&mut collector).unwrap(), 1);
    assert_eq!(mem.all_rows()[0][0], Value::integer(50));
    assert_eq!(session.last_identity(), Value::integer(50));
}

/// Omitted columns expand their defaults; the DEFAULT marker does too
#[test]
fn test_insert_defaults() {
    let table = Arc::new(MemTable::new(
        SchemaBuilder::new("d")
            .add_identity("id", DataType::Integer)
            .add_with_default("v", DataType::Integer, ColumnDefault::Constant(Value::integer(42)))
            .add_nullable("note", DataType::Text)
            .build(),
    ));
    let store: Arc<dyn RowStore> = table.clone();
    let session = Arc::new(Session::new());

    // column omitted entirely
    let mut insert = Insert::new(
        session.clone(),
        store.clone(),
        vec!["note".to_string()],
        values(vec![vec![Value::text("x")]]),
    );
    let mut collector = default_collector(&session, store.as_ref());
    insert.update(&mut collector).expect("Failed to insert");

    // DEFAULT marker in the VALUES list
    let mut insert = Insert::new(
        session.clone(),
        store.clone(),
        vec!["v".to_string(), "note".to_string()],
        InsertSource::Values(vec![vec![
            ScalarExpr::Default,
            ScalarExpr::literal(Value::text("y")),
        ]]),
    );
    insert.update(&mut collector).expect("Failed to insert");

    let rows = table.all_rows();
    assert_eq!(rows[0][1], Value::integer(42));
    assert_eq!(rows[1][1], Value::integer(42));
}

/// INSERT from a streamed sub-query source
#[test]
fn test_insert_from_query_source() {
    let (mem, table, session) = identity_fixture();
    let source_rows = vec![
        Row::from_values(vec![Value::integer(7)]),
        Row::from_values(vec![Value::integer(8)]),
        Row::from_values(vec![Value::integer(9)]),
    ];
    let mut insert = Insert::new(
        session.clone(),
        table.clone(),
        vec!["v".to_string()],
        InsertSource::Query(Box::new(VecScanner::new(source_rows))),
    );
    let mut collector = default_collector(&session, table.as_ref());
    assert_eq!(insert.update(&mut collector).unwrap(), 3);
    assert_eq!(mem.row_count(), 3);
}

/// INSERT emits NEW then FINAL and no OLD
#[test]
fn test_insert_event_sequence() {
    let (_mem, table, session) = identity_fixture();
    let old_sink = sink(LocalResult::new(vec!["id".to_string(), "v".to_string()]));
    let new_sink = sink(LocalResult::new(vec!["id".to_string(), "v".to_string()]));
    let final_sink = sink(LocalResult::new(vec!["id".to_string(), "v".to_string()]));
    let mut collector = DeltaCollector::Composite(vec![
        DeltaCollector::DataChangeDeltaTable {
            option: ResultOption::Old,
            sink: old_sink.clone(),
        },
        DeltaCollector::DataChangeDeltaTable {
            option: ResultOption::New,
            sink: new_sink.clone(),
        },
        DeltaCollector::DataChangeDeltaTable {
            option: ResultOption::Final,
            sink: final_sink.clone(),
        },
    ]);

    let mut insert = Insert::new(
        session.clone(),
        table.clone(),
        vec!["v".to_string()],
        values(vec![vec![Value::integer(7)]]),
    );
    insert.update(&mut collector).expect("Failed to insert");

    assert!(old_sink.lock().is_empty());
    assert_eq!(new_sink.lock().rows().len(), 1);
    assert_eq!(final_sink.lock().rows().len(), 1);
    // identity already assigned when NEW fires
    assert!(!new_sink.lock().rows()[0][0].is_null());
}

/// A unique violation without ON DUPLICATE KEY is an integrity violation
#[test]
fn test_insert_duplicate_key_error() {
    let (mem, table, session) = identity_fixture();
    seed_rows(&mem, &session, vec![vec![Value::integer(1), Value::integer(10)]])
        .expect("Failed to seed");

    let mut insert = Insert::new(
        session.clone(),
        table.clone(),
        Vec::new(),
        values(vec![vec![Value::integer(1), Value::integer(99)]]),
    );
    let mut collector = default_collector(&session, table.as_ref());
    let err = insert.update(&mut collector).unwrap_err();
    assert!(err.is_integrity_violation());
    assert_eq!(mem.all_rows()[0][1], Value::integer(10));
}

/// ON DUPLICATE KEY routes the conflicting row through the UPDATE path
#[test]
fn test_insert_on_duplicate_key_updates() {
    let (mem, table, session) = identity_fixture();
    seed_rows(&mem, &session, vec![vec![Value::integer(1), Value::integer(10)]])
        .expect("Failed to seed");

    let mut insert = Insert::new(
        session.clone(),
        table.clone(),
        Vec::new(),
        values(vec![vec![Value::integer(1), Value::integer(99)]]),
    );
    insert.set_on_duplicate(SetClauseList::new().set("v", ScalarExpr::literal(Value::integer(99))));

    let mut collector = default_collector(&session, table.as_ref());
    let count = insert.update(&mut collector).expect("Failed to upsert");
    assert_eq!(count, 1);
    assert_eq!(mem.row_count(), 1);
    assert_eq!(mem.all_rows()[0][1], Value::integer(99));
}

/// Scenario: MERGE routes matched rows through UPDATE and unmatched rows
/// through INSERT; per source row collectors see either the UPDATE
/// OLD/NEW/FINAL triple or the INSERT NEW/FINAL pair, never a mix
#[test]
fn test_merge_event_routing() {
    let (mem, table, session) = identity_fixture();
    seed_rows(&mem, &session, vec![vec![Value::integer(1), Value::integer(10)]])
        .expect("Failed to seed");

    // an INSERT row trigger must stay silent for the matched row
    let insert_trigger_fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = insert_trigger_fired.clone();
        table.triggers().add_before_row([Action::Insert], move |_, _, _| {
            fired.fetch_add(1, Ordering::SeqCst);
            false
        });
    }

    let old_sink = sink(LocalResult::new(vec!["id".to_string(), "v".to_string()]));
    let new_sink = sink(LocalResult::new(vec!["id".to_string(), "v".to_string()]));
    let final_sink = sink(LocalResult::new(vec!["id".to_string(), "v".to_string()]));
    let mut collector = DeltaCollector::Composite(vec![
        DeltaCollector::DataChangeDeltaTable {
            option: ResultOption::Old,
            sink: old_sink.clone(),
        },
        DeltaCollector::DataChangeDeltaTable {
            option: ResultOption::New,
            sink: new_sink.clone(),
        },
        DeltaCollector::DataChangeDeltaTable {
            option: ResultOption::Final,
            sink: final_sink.clone(),
        },
    ]);

    // the matched source row carries v = 999 so a stray (INSERT, NEW)
    // with the would-be-inserted values is detectable
    let mut merge = Merge::new(
        session.clone(),
        table.clone(),
        Vec::new(),
        values(vec![
            vec![Value::integer(1), Value::integer(999)], // matched -> UPDATE
            vec![Value::integer(2), Value::integer(20)],  // unmatched -> INSERT
        ]),
        SetClauseList::new().set("v", ScalarExpr::literal(Value::integer(11))),
    );
    let count = merge.update(&mut collector).expect("Failed to merge");
    assert_eq!(count, 2);

    let rows = mem.all_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], Value::integer(11));
    assert_eq!(rows[1][0], Value::integer(2));

    // matched row: UPDATE OLD only
    let old = old_sink.lock();
    assert_eq!(old.rows().len(), 1);
    assert_eq!(old.rows()[0][1], Value::integer(10));
    // one NEW per source row, neither carrying the unrouted insert values
    let new = new_sink.lock();
    assert_eq!(new.rows().len(), 2);
    assert_eq!(new.rows()[0][1], Value::integer(11));
    assert_eq!(new.rows()[1][1], Value::integer(20));
    // both arms produced a FINAL event
    assert_eq!(final_sink.lock().rows().len(), 2);
    // only the unmatched row went through the INSERT trigger
    assert_eq!(insert_trigger_fired.load(Ordering::SeqCst), 1);
}

/// MERGE needs the UPDATE right on top of INSERT
#[test]
fn test_merge_rights() {
    let (_mem, table, session) = identity_fixture();
    session.revoke("i", Right::Update);
    let mut merge = Merge::new(
        session.clone(),
        table.clone(),
        Vec::new(),
        values(vec![vec![Value::integer(1), Value::integer(10)]]),
        SetClauseList::new().set("v", ScalarExpr::literal(Value::integer(1))),
    );
    let mut collector = default_collector(&session, table.as_ref());
    assert!(matches!(
        merge.update(&mut collector),
        Err(Error::AccessDenied { .. })
    ));
}

/// VALUES arity must match the insert column list
#[test]
fn test_insert_arity_mismatch() {
    let (_mem, table, session) = identity_fixture();
    let mut insert = Insert::new(
        session.clone(),
        table.clone(),
        vec!["v".to_string()],
        values(vec![vec![Value::integer(1), Value::integer(2)]]),
    );
    let mut collector = default_collector(&session, table.as_ref());
    assert!(matches!(
        insert.update(&mut collector),
        Err(Error::InvalidValue { .. })
    ));
}

/// A BEFORE row trigger veto skips the insert after NEW was delivered
#[test]
fn test_insert_row_veto() {
    let (mem, table, session) = identity_fixture();
    table
        .triggers()
        .add_before_row([Action::Insert], |_, _, _| true);

    let new_sink = sink(LocalResult::new(vec!["id".to_string(), "v".to_string()]));
    let mut collector = DeltaCollector::DataChangeDeltaTable {
        option: ResultOption::New,
        sink: new_sink.clone(),
    };
    let mut insert = Insert::new(
        session.clone(),
        table.clone(),
        vec!["v".to_string()],
        values(vec![vec![Value::integer(7)]]),
    );
    let count = insert.update(&mut collector).expect("Failed to insert");
    assert_eq!(count, 0);
    assert_eq!(mem.row_count(), 0);
    assert_eq!(new_sink.lock().rows().len(), 1);
}
