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

//! Row type for Rowforge - an ordered collection of column values

use std::fmt;
use std::ops::Index;

use super::error::{Error, Result};
use super::schema::Schema;
use super::value::Value;

/// Opaque row pointer issued by the row store.
///
/// Stable for the duration of the row's physical existence; a deleted row's
/// pointer is never reused within the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A database row containing column values
///
/// A row is an ordered sequence of typed values of the table's column count.
/// Executors own rows exclusively until they hand them to the row store or
/// discard them on a trigger veto; collectors only ever see `&[Value]` views.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Create a new empty row
    #[inline]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Create a row with pre-allocated capacity
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Create a row from a vector of values
    #[inline]
    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Create a row with typed null values for a given schema
    pub fn null_row(schema: &Schema) -> Self {
        let values = schema
            .columns
            .iter()
            .map(|col| Value::null(col.data_type))
            .collect();
        Self { values }
    }

    /// Get the number of values in the row
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Set a value at the given index
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        if index >= self.values.len() {
            return Err(Error::internal(format!(
                "row index {} out of bounds (len={})",
                index,
                self.values.len()
            )));
        }
        self.values[index] = value;
        Ok(())
    }

    /// Push a value onto the end of the row
    #[inline]
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Get the values as a slice
    #[inline]
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row, returning the values
    #[inline]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Iterate over the values
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Validate the row against a schema: arity, NOT NULL, value types
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if self.values.len() != schema.columns.len() {
            return Err(Error::internal(format!(
                "row has {} values, table '{}' has {} columns",
                self.values.len(),
                schema.table_name,
                schema.columns.len()
            )));
        }
        for (value, column) in self.values.iter().zip(schema.columns.iter()) {
            if value.is_null() {
                if !column.nullable && !column.identity {
                    return Err(Error::not_null_constraint(column.name.clone()));
                }
            } else if value.data_type() != column.data_type {
                return Err(Error::type_conversion(
                    value.data_type().to_string(),
                    column.data_type.to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::from_values(values)
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}
