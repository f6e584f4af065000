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

//! Comparison expression (column op value)
//!
//! The most commonly used predicate, handling `column = value`,
//! `column > value`, etc. NULL never matches any comparison.

use crate::core::{Error, Operator, Result, Row, Schema, Value};

use super::Expression;

/// Comparison expression (column op value)
///
/// # Examples
/// - `id = 1`
/// - `name = 'Alice'`
/// - `b >= 10`
#[derive(Debug, Clone)]
pub struct ComparisonExpr {
    /// Column name to compare
    column: String,
    /// Comparison operator
    operator: Operator,
    /// Comparison value
    value: Value,
    /// Pre-computed column ordinal (None if not prepared)
    col_index: Option<usize>,
}

impl ComparisonExpr {
    /// Create a new comparison expression
    pub fn new(column: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
            col_index: None,
        }
    }

    /// Create an equality expression (column = value)
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    /// Create a not-equal expression (column != value)
    pub fn ne(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, Operator::Ne, value)
    }

    /// Create a greater-than expression (column > value)
    pub fn gt(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, Operator::Gt, value)
    }

    /// Create a greater-than-or-equal expression (column >= value)
    pub fn gte(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, Operator::Gte, value)
    }

    /// Create a less-than expression (column < value)
    pub fn lt(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, Operator::Lt, value)
    }

    /// Create a less-than-or-equal expression (column <= value)
    pub fn lte(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, Operator::Lte, value)
    }

    /// Get the column name
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Get the operator
    pub fn operator(&self) -> Operator {
        self.operator
    }
}

impl Expression for ComparisonExpr {
    fn evaluate(&self, row: &Row) -> Result<bool> {
        let index = self
            .col_index
            .ok_or_else(|| Error::internal("comparison expression not prepared"))?;
        let cell = row
            .get(index)
            .ok_or_else(|| Error::internal(format!("row has no column {}", index)))?;
        if cell.is_null() || self.value.is_null() {
            return Ok(false);
        }
        let ordering = match cell.compare(&self.value) {
            Ok(ordering) => ordering,
            // incomparable types never match
            Err(_) => return Ok(false),
        };
        Ok(match self.operator {
            Operator::Eq => ordering.is_eq(),
            Operator::Ne => ordering.is_ne(),
            Operator::Gt => ordering.is_gt(),
            Operator::Gte => ordering.is_ge(),
            Operator::Lt => ordering.is_lt(),
            Operator::Lte => ordering.is_le(),
        })
    }

    fn prepare_for_schema(&mut self, schema: &Schema) -> Result<()> {
        let index = schema
            .column_index_map()
            .get(&self.column.to_lowercase())
            .copied()
            .ok_or_else(|| Error::ColumnNotFound(self.column.clone()))?;
        // coerce the literal to the column type once, not per row
        let column_type = schema.columns[index].data_type;
        if !self.value.is_null() && self.value.data_type() != column_type {
            self.value = self.value.coerce_to_type(column_type);
        }
        self.col_index = Some(index);
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        self.col_index.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, SchemaBuilder};

    fn schema() -> Schema {
        SchemaBuilder::new("t")
            .add_primary_key("a", DataType::Integer)
            .add("b", DataType::Integer)
            .build()
    }

    #[test]
    fn test_comparison() {
        let schema = schema();
        let row = Row::from_values(vec![Value::integer(1), Value::integer(10)]);

        let mut expr = ComparisonExpr::gte("b", Value::integer(10));
        expr.prepare_for_schema(&schema).unwrap();
        assert!(expr.evaluate(&row).unwrap());

        let mut expr = ComparisonExpr::lt("b", Value::integer(10));
        expr.prepare_for_schema(&schema).unwrap();
        assert!(!expr.evaluate(&row).unwrap());
    }

    #[test]
    fn test_null_never_matches() {
        let schema = schema();
        let row = Row::from_values(vec![Value::integer(1), Value::null(DataType::Integer)]);
        let mut expr = ComparisonExpr::eq("b", Value::integer(10));
        expr.prepare_for_schema(&schema).unwrap();
        assert!(!expr.evaluate(&row).unwrap());
    }

    #[test]
    fn test_literal_coercion_on_prepare() {
        let schema = schema();
        let row = Row::from_values(vec![Value::integer(1), Value::integer(5)]);
        let mut expr = ComparisonExpr::eq("b", Value::text("5"));
        expr.prepare_for_schema(&schema).unwrap();
        assert!(expr.evaluate(&row).unwrap());
    }

    #[test]
    fn test_unknown_column() {
        let schema = schema();
        let mut expr = ComparisonExpr::eq("missing", Value::integer(1));
        assert!(matches!(
            expr.prepare_for_schema(&schema),
            Err(Error::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_unprepared_errors() {
        let row = Row::from_values(vec![Value::integer(1)]);
        let expr = ComparisonExpr::eq("a", Value::integer(1));
        assert!(!expr.is_prepared());
        assert!(expr.evaluate(&row).is_err());
    }
}
