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

//! In-memory row store
//!
//! Rows live in an append-only slot arena; a slot index is the row's
//! stable pointer and is never reused after deletion. Table and per-row
//! write locks are keyed by session and waited on with the session's lock
//! timeout. The store validates arity, NOT NULL, value types, CHECK
//! constraints and primary key uniqueness as a backstop behind the
//! executors' own constraint handling.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::core::{Error, Result, Row, RowId, Schema, Value};
use crate::executor::session::Session;
use crate::executor::triggers::TriggerSet;

use super::traits::{LockMode, RowStore};

#[derive(Default)]
struct LockState {
    table_writer: Option<u64>,
    table_readers: FxHashMap<u64, usize>,
    row_locks: FxHashMap<u64, u64>,
}

impl LockState {
    fn table_write_free(&self, session_id: u64) -> bool {
        let writer_ok = match self.table_writer {
            None => true,
            Some(owner) => owner == session_id,
        };
        let readers_ok = self
            .table_readers
            .keys()
            .all(|&reader| reader == session_id);
        writer_ok && readers_ok
    }

    fn table_read_free(&self, session_id: u64) -> bool {
        match self.table_writer {
            None => true,
            Some(owner) => owner == session_id,
        }
    }
}

/// An in-memory table implementing [`RowStore`]
pub struct MemTable {
    schema: Schema,
    triggers: TriggerSet,
    rows: RwLock<Vec<Option<Row>>>,
    identity_seq: AtomicI64,
    lock_state: Mutex<LockState>,
    lock_cond: Condvar,
}

impl MemTable {
    /// Create an empty table with the given schema
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            triggers: TriggerSet::new(),
            rows: RwLock::new(Vec::new()),
            identity_seq: AtomicI64::new(1),
            lock_state: Mutex::new(LockState::default()),
            lock_cond: Condvar::new(),
        }
    }

    /// Number of live rows
    pub fn row_count(&self) -> usize {
        self.rows.read().iter().filter(|r| r.is_some()).count()
    }

    /// Snapshot of all live rows, in slot order
    pub fn all_rows(&self) -> Vec<Row> {
        self.rows.read().iter().flatten().cloned().collect()
    }

    fn wait_for_lock(
        &self,
        session: &Session,
        mut acquire: impl FnMut(&mut LockState) -> bool,
    ) -> Result<()> {
        let timeout = session.lock_timeout();
        let deadline = Instant::now() + timeout;
        let mut state = self.lock_state.lock();
        loop {
            if acquire(&mut state) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::lock_timeout(self.schema.table_name.clone()));
            }
            if self
                .lock_cond
                .wait_for(&mut state, deadline - now)
                .timed_out()
            {
                // one more acquire attempt before giving up
                if acquire(&mut state) {
                    return Ok(());
                }
                return Err(Error::lock_timeout(self.schema.table_name.clone()));
            }
        }
    }

    /// Find a live row sharing `row`'s primary key, ignoring `exclude`
    fn key_match(&self, row: &Row, exclude: Option<RowId>) -> Option<RowId> {
        let pk = self.schema.primary_key_indices();
        if pk.is_empty() {
            return None;
        }
        let rows = self.rows.read();
        for (slot, existing) in rows.iter().enumerate() {
            let Some(existing) = existing else { continue };
            if exclude == Some(RowId(slot as u64)) {
                continue;
            }
            if pk.iter().all(|&i| {
                let a = &row[i];
                let b = &existing[i];
                !a.is_null() && !b.is_null() && a == b
            }) {
                return Some(RowId(slot as u64));
            }
        }
        None
    }

    /// Check primary key uniqueness of `row` against all live rows,
    /// ignoring `exclude`
    fn check_unique(&self, row: &Row, exclude: Option<RowId>) -> Result<()> {
        match self.key_match(row, exclude) {
            Some(existing) => Err(Error::duplicate_key(
                self.schema.table_name.clone(),
                existing,
            )),
            None => Ok(()),
        }
    }

    fn validate(&self, row: &Row) -> Result<()> {
        row.validate(&self.schema)?;
        for column in &self.schema.columns {
            if let Some(check) = &column.check {
                if !check.holds(&row[column.id]) {
                    return Err(Error::check_constraint(column.name.clone()));
                }
            }
        }
        Ok(())
    }
}

impl RowStore for MemTable {
    fn name(&self) -> &str {
        &self.schema.table_name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn triggers(&self) -> &TriggerSet {
        &self.triggers
    }

    fn next_identity(&self) -> i64 {
        self.identity_seq.fetch_add(1, Ordering::SeqCst)
    }

    fn plan_scan(&self) -> Vec<RowId> {
        self.rows
            .read()
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_some())
            .map(|(slot, _)| RowId(slot as u64))
            .collect()
    }

    fn read_row(&self, ptr: RowId) -> Option<Row> {
        self.rows.read().get(ptr.0 as usize)?.clone()
    }

    fn find_row_by_key(&self, row: &Row) -> Option<RowId> {
        self.key_match(row, None)
    }

    fn lock_table(&self, session: &Session, mode: LockMode) -> Result<()> {
        let session_id = session.id();
        match mode {
            LockMode::Read => self.wait_for_lock(session, |state| {
                if state.table_read_free(session_id) {
                    *state.table_readers.entry(session_id).or_insert(0) += 1;
                    true
                } else {
                    false
                }
            }),
            LockMode::Write => self.wait_for_lock(session, |state| {
                if state.table_write_free(session_id) {
                    state.table_writer = Some(session_id);
                    true
                } else {
                    false
                }
            }),
        }
    }

    fn lock_row(&self, session: &Session, ptr: RowId) -> Result<()> {
        let session_id = session.id();
        self.wait_for_lock(session, |state| match state.row_locks.get(&ptr.0) {
            None => {
                state.row_locks.insert(ptr.0, session_id);
                true
            }
            Some(&owner) => owner == session_id,
        })
    }

    fn unlock_row(&self, session: &Session, ptr: RowId) {
        let mut state = self.lock_state.lock();
        if state.row_locks.get(&ptr.0) == Some(&session.id()) {
            state.row_locks.remove(&ptr.0);
            self.lock_cond.notify_all();
        }
    }

    fn release_session_locks(&self, session: &Session) {
        let session_id = session.id();
        let mut state = self.lock_state.lock();
        if state.table_writer == Some(session_id) {
            state.table_writer = None;
        }
        state.table_readers.remove(&session_id);
        state.row_locks.retain(|_, owner| *owner != session_id);
        self.lock_cond.notify_all();
    }

    fn add_row(&self, _session: &Session, row: Row) -> Result<RowId> {
        self.validate(&row)?;
        self.check_unique(&row, None)?;
        let mut rows = self.rows.write();
        let slot = rows.len();
        rows.push(Some(row));
        Ok(RowId(slot as u64))
    }

    fn remove_row(&self, session: &Session, ptr: RowId) -> Result<()> {
        let mut rows = self.rows.write();
        let slot = rows
            .get_mut(ptr.0 as usize)
            .ok_or_else(|| Error::internal(format!("no such row {}", ptr)))?;
        if slot.take().is_none() {
            return Err(Error::internal(format!("row {} already removed", ptr)));
        }
        drop(rows);
        self.unlock_row(session, ptr);
        Ok(())
    }

    fn update_row(&self, _session: &Session, ptr: RowId, new_row: Row) -> Result<()> {
        self.validate(&new_row)?;
        self.check_unique(&new_row, Some(ptr))?;
        let mut rows = self.rows.write();
        let slot = rows
            .get_mut(ptr.0 as usize)
            .ok_or_else(|| Error::internal(format!("no such row {}", ptr)))?;
        if slot.is_none() {
            return Err(Error::internal(format!("row {} already removed", ptr)));
        }
        *slot = Some(new_row);
        Ok(())
    }
}

/// Fill identity and default values the way the INSERT executor expects
/// plain test fixtures to arrive: a fully populated row.
pub fn seed_rows(table: &MemTable, session: &Session, rows: Vec<Vec<Value>>) -> Result<Vec<RowId>> {
    let mut ids = Vec::with_capacity(rows.len());
    for values in rows {
        ids.push(table.add_row(session, Row::from_values(values))?);
    }
    Ok(ids)
}
