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

//! Result sinks and the local row buffer
//!
//! Delta collectors write projected rows into a [`ResultTarget`]. The
//! concrete buffer, [`LocalResult`], is owned by the current statement and
//! shared with the caller through a [`ResultSink`] so it can be read after
//! `update()` returns.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{Row, Schema, Value};

/// A sink rows can be appended to
pub trait ResultTarget {
    /// Append one row of values
    fn add_row(&mut self, values: &[Value]);

    /// Number of rows appended so far
    fn row_count(&self) -> u64;
}

/// An in-memory result: column names plus buffered rows, with a cursor
/// for reading back
#[derive(Debug, Clone, Default)]
pub struct LocalResult {
    column_names: Vec<String>,
    rows: Vec<Row>,
    cursor: Option<usize>,
}

impl LocalResult {
    /// Create a result with the given column names
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            column_names,
            rows: Vec::new(),
            cursor: None,
        }
    }

    /// Create a result shaped like a table's rows
    pub fn for_table(schema: &Schema) -> Self {
        Self::new(schema.column_names())
    }

    /// Column names
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Buffered rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Whether the result holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Advance the read cursor; true while a row is available
    pub fn next(&mut self) -> bool {
        let next = match self.cursor {
            None => 0,
            Some(i) => i + 1,
        };
        if next < self.rows.len() {
            self.cursor = Some(next);
            true
        } else {
            self.cursor = Some(self.rows.len());
            false
        }
    }

    /// The row under the cursor
    pub fn current_row(&self) -> &Row {
        &self.rows[self.cursor.expect("cursor before first row")]
    }

    /// Reset the read cursor to before the first row
    pub fn reset(&mut self) {
        self.cursor = None;
    }
}

impl ResultTarget for LocalResult {
    fn add_row(&mut self, values: &[Value]) {
        self.rows.push(Row::from_values(values.to_vec()));
    }

    fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }
}

/// A shared handle to a statement-local result buffer
pub type ResultSink = Arc<Mutex<LocalResult>>;

/// Wrap a result in a shareable sink
pub fn sink(result: LocalResult) -> ResultSink {
    Arc::new(Mutex::new(result))
}

/// Take the buffered result out of a sink, leaving an empty one behind
pub fn take_sink(sink: &ResultSink) -> LocalResult {
    std::mem::take(&mut sink.lock())
}
