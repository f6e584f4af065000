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

//! Schema types for Rowforge - table and column definitions

use std::fmt;
use std::sync::OnceLock;

use chrono::Utc;
use rustc_hash::FxHashMap;

use super::types::{DataType, Operator};
use super::value::Value;

/// Default value of a column, expanded for omitted INSERT columns
///
/// Non-constant defaults matter to the generated-keys projector: a column
/// whose default is re-evaluated per row is "interesting" to callers.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    /// A fixed value
    Constant(Value),

    /// The statement's wall-clock time, evaluated per row
    CurrentTimestamp,
}

impl ColumnDefault {
    /// Whether the default evaluates to the same value on every row
    pub fn is_constant(&self) -> bool {
        matches!(self, ColumnDefault::Constant(_))
    }

    /// Evaluate the default for one row
    pub fn evaluate(&self) -> Value {
        match self {
            ColumnDefault::Constant(v) => v.clone(),
            ColumnDefault::CurrentTimestamp => Value::Timestamp(Utc::now()),
        }
    }
}

/// A single-column CHECK constraint: `value <op> operand` must hold.
///
/// NULL values pass the check, per SQL semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCheck {
    pub op: Operator,
    pub operand: Value,
}

impl ColumnCheck {
    pub fn new(op: Operator, operand: Value) -> Self {
        Self { op, operand }
    }

    /// Evaluate the check against a single value
    pub fn holds(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match value.compare(&self.operand) {
            Ok(ordering) => match self.op {
                Operator::Eq => ordering.is_eq(),
                Operator::Ne => ordering.is_ne(),
                Operator::Gt => ordering.is_gt(),
                Operator::Gte => ordering.is_ge(),
                Operator::Lt => ordering.is_lt(),
                Operator::Lte => ordering.is_le(),
            },
            Err(_) => false,
        }
    }
}

/// A column definition in a table schema
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaColumn {
    /// Ordinal of the column (0-based index)
    pub id: usize,

    /// Column name
    pub name: String,

    /// Data type of the column
    pub data_type: DataType,

    /// Whether the column can contain NULL values
    pub nullable: bool,

    /// Whether this column is part of the primary key
    pub primary_key: bool,

    /// Whether this column draws values from the table's identity sequence
    /// when left unset
    pub identity: bool,

    /// Default value expanded for omitted INSERT columns
    pub default: Option<ColumnDefault>,

    /// Single-column CHECK constraint
    pub check: Option<ColumnCheck>,
}

impl SchemaColumn {
    /// Create a new column definition
    pub fn new(
        id: usize,
        name: impl Into<String>,
        data_type: DataType,
        nullable: bool,
        primary_key: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            nullable,
            primary_key,
            identity: false,
            default: None,
            check: None,
        }
    }

    /// Create a simple non-nullable, non-primary-key column
    pub fn simple(id: usize, name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, name, data_type, false, false)
    }

    /// Create a nullable column
    pub fn nullable(id: usize, name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, name, data_type, true, false)
    }

    /// Create a primary key column
    pub fn primary_key(id: usize, name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, name, data_type, false, true)
    }
}

impl fmt::Display for SchemaColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if self.identity {
            write!(f, " IDENTITY")?;
        }
        if self.primary_key {
            write!(f, " PRIMARY KEY")?;
        }
        if !self.nullable && !self.primary_key {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Table schema definition
#[derive(Debug)]
pub struct Schema {
    /// Name of the table
    pub table_name: String,

    /// Pre-computed lowercase table name for case-insensitive lookups
    pub table_name_lower: String,

    /// Column definitions
    pub columns: Vec<SchemaColumn>,

    /// Cached column index map (lowercase name -> index) for O(1) lookup
    column_index_map_cache: OnceLock<FxHashMap<String, usize>>,

    /// Cached identity column ordinal
    identity_column_cache: OnceLock<Option<usize>>,
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Self {
            table_name: self.table_name.clone(),
            table_name_lower: self.table_name_lower.clone(),
            columns: self.columns.clone(),
            column_index_map_cache: OnceLock::new(),
            identity_column_cache: OnceLock::new(),
        }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.table_name == other.table_name && self.columns == other.columns
    }
}

impl Schema {
    /// Create a new schema with the given table name and columns
    pub fn new(table_name: impl Into<String>, columns: Vec<SchemaColumn>) -> Self {
        let table_name = table_name.into();
        let table_name_lower = table_name.to_lowercase();
        Self {
            table_name,
            table_name_lower,
            columns,
            column_index_map_cache: OnceLock::new(),
            identity_column_cache: OnceLock::new(),
        }
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names, in ordinal order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Lowercase-name to ordinal map, computed lazily
    pub fn column_index_map(&self) -> &FxHashMap<String, usize> {
        self.column_index_map_cache.get_or_init(|| {
            self.columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.name.to_lowercase(), i))
                .collect()
        })
    }

    /// Find a column ordinal by exact name
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Find a column ordinal ignoring ASCII case
    pub fn find_column_ignore_case(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get a column by name
    pub fn get_column_by_name(&self, name: &str) -> Option<&SchemaColumn> {
        self.find_column(name).map(|i| &self.columns[i])
    }

    /// Whether the schema has a column with the given name
    pub fn has_column(&self, name: &str) -> bool {
        self.find_column(name).is_some()
    }

    /// Ordinals of the primary key columns, in ordinal order
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect()
    }

    /// Ordinal of the identity column, if the table has one
    pub fn identity_column(&self) -> Option<usize> {
        *self
            .identity_column_cache
            .get_or_init(|| self.columns.iter().position(|c| c.identity))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.table_name)?;
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", col)?;
        }
        write!(f, ")")
    }
}

/// Builder for constructing table schemas
///
/// # Example
///
/// ```
/// use rowforge::core::{DataType, SchemaBuilder};
///
/// let schema = SchemaBuilder::new("users")
///     .add_identity("id", DataType::Integer)
///     .add("name", DataType::Text)
///     .add_nullable("email", DataType::Text)
///     .build();
/// assert_eq!(schema.column_count(), 3);
/// assert_eq!(schema.identity_column(), Some(0));
/// ```
pub struct SchemaBuilder {
    table_name: String,
    columns: Vec<SchemaColumn>,
}

impl SchemaBuilder {
    /// Start a new schema for the named table
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a non-nullable column
    pub fn add(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let id = self.columns.len();
        self.columns.push(SchemaColumn::simple(id, name, data_type));
        self
    }

    /// Add a nullable column
    pub fn add_nullable(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let id = self.columns.len();
        self.columns
            .push(SchemaColumn::nullable(id, name, data_type));
        self
    }

    /// Add a primary key column
    pub fn add_primary_key(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let id = self.columns.len();
        self.columns
            .push(SchemaColumn::primary_key(id, name, data_type));
        self
    }

    /// Add an identity primary key column (sequence-assigned when left unset)
    pub fn add_identity(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let id = self.columns.len();
        let mut column = SchemaColumn::primary_key(id, name, data_type);
        column.identity = true;
        self.columns.push(column);
        self
    }

    /// Add a column with a default value
    pub fn add_with_default(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        default: ColumnDefault,
    ) -> Self {
        let id = self.columns.len();
        let mut column = SchemaColumn::simple(id, name, data_type);
        column.default = Some(default);
        self.columns.push(column);
        self
    }

    /// Attach a CHECK constraint to the most recently added column
    pub fn check(mut self, op: Operator, operand: Value) -> Self {
        if let Some(last) = self.columns.last_mut() {
            last.check = Some(ColumnCheck::new(op, operand));
        }
        self
    }

    /// Build the schema
    pub fn build(self) -> Schema {
        Schema::new(self.table_name, self.columns)
    }
}
