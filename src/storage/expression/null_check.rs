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

//! NULL check expression (column IS NULL / IS NOT NULL)

use crate::core::{Error, Result, Row, Schema};

use super::Expression;

/// NULL check expression
#[derive(Debug, Clone)]
pub struct NullCheckExpr {
    column: String,
    is_null: bool,
    col_index: Option<usize>,
}

impl NullCheckExpr {
    /// Create an IS NULL check
    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            is_null: true,
            col_index: None,
        }
    }

    /// Create an IS NOT NULL check
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            is_null: false,
            col_index: None,
        }
    }
}

impl Expression for NullCheckExpr {
    fn evaluate(&self, row: &Row) -> Result<bool> {
        let index = self
            .col_index
            .ok_or_else(|| Error::internal("null check expression not prepared"))?;
        let cell = row
            .get(index)
            .ok_or_else(|| Error::internal(format!("row has no column {}", index)))?;
        Ok(cell.is_null() == self.is_null)
    }

    fn prepare_for_schema(&mut self, schema: &Schema) -> Result<()> {
        let index = schema
            .column_index_map()
            .get(&self.column.to_lowercase())
            .copied()
            .ok_or_else(|| Error::ColumnNotFound(self.column.clone()))?;
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
    use crate::core::{DataType, SchemaBuilder, Value};

    #[test]
    fn test_null_check() {
        let schema = SchemaBuilder::new("t")
            .add("a", DataType::Integer)
            .add_nullable("b", DataType::Text)
            .build();
        let row = Row::from_values(vec![Value::integer(1), Value::null(DataType::Text)]);

        let mut is_null = NullCheckExpr::is_null("b");
        is_null.prepare_for_schema(&schema).unwrap();
        assert!(is_null.evaluate(&row).unwrap());

        let mut not_null = NullCheckExpr::is_not_null("b");
        not_null.prepare_for_schema(&schema).unwrap();
        assert!(!not_null.evaluate(&row).unwrap());
    }
}
