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

//! Logical expressions: AND, OR, NOT, and constant booleans

use crate::core::{Result, Row, Schema};

use super::Expression;

/// Logical AND over child expressions; short-circuits on the first false
#[derive(Debug)]
pub struct AndExpr {
    children: Vec<Box<dyn Expression>>,
}

impl AndExpr {
    pub fn new(children: Vec<Box<dyn Expression>>) -> Self {
        Self { children }
    }
}

impl Expression for AndExpr {
    fn evaluate(&self, row: &Row) -> Result<bool> {
        for child in &self.children {
            if !child.evaluate(row)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn prepare_for_schema(&mut self, schema: &Schema) -> Result<()> {
        for child in &mut self.children {
            child.prepare_for_schema(schema)?;
        }
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        self.children.iter().all(|c| c.is_prepared())
    }
}

/// Logical OR over child expressions; short-circuits on the first true
#[derive(Debug)]
pub struct OrExpr {
    children: Vec<Box<dyn Expression>>,
}

impl OrExpr {
    pub fn new(children: Vec<Box<dyn Expression>>) -> Self {
        Self { children }
    }
}

impl Expression for OrExpr {
    fn evaluate(&self, row: &Row) -> Result<bool> {
        for child in &self.children {
            if child.evaluate(row)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn prepare_for_schema(&mut self, schema: &Schema) -> Result<()> {
        for child in &mut self.children {
            child.prepare_for_schema(schema)?;
        }
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        self.children.iter().all(|c| c.is_prepared())
    }
}

/// Logical NOT of a child expression
#[derive(Debug)]
pub struct NotExpr {
    inner: Box<dyn Expression>,
}

impl NotExpr {
    pub fn new(inner: Box<dyn Expression>) -> Self {
        Self { inner }
    }
}

impl Expression for NotExpr {
    fn evaluate(&self, row: &Row) -> Result<bool> {
        Ok(!self.inner.evaluate(row)?)
    }

    fn prepare_for_schema(&mut self, schema: &Schema) -> Result<()> {
        self.inner.prepare_for_schema(schema)
    }

    fn is_prepared(&self) -> bool {
        self.inner.is_prepared()
    }
}

/// Constant TRUE or FALSE (e.g. `WHERE TRUE`)
#[derive(Debug, Clone)]
pub struct ConstBoolExpr {
    value: bool,
}

impl ConstBoolExpr {
    pub fn new(value: bool) -> Self {
        Self { value }
    }
}

impl Expression for ConstBoolExpr {
    fn evaluate(&self, _row: &Row) -> Result<bool> {
        Ok(self.value)
    }

    fn prepare_for_schema(&mut self, _schema: &Schema) -> Result<()> {
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, SchemaBuilder, Value};
    use crate::storage::expression::ComparisonExpr;

    #[test]
    fn test_and_or_not() {
        let schema = SchemaBuilder::new("t")
            .add("a", DataType::Integer)
            .add("b", DataType::Integer)
            .build();
        let row = Row::from_values(vec![Value::integer(1), Value::integer(10)]);

        let mut and = AndExpr::new(vec![
            Box::new(ComparisonExpr::eq("a", Value::integer(1))),
            Box::new(ComparisonExpr::gte("b", Value::integer(10))),
        ]);
        and.prepare_for_schema(&schema).unwrap();
        assert!(and.evaluate(&row).unwrap());

        let mut or = OrExpr::new(vec![
            Box::new(ComparisonExpr::eq("a", Value::integer(2))),
            Box::new(ComparisonExpr::eq("b", Value::integer(10))),
        ]);
        or.prepare_for_schema(&schema).unwrap();
        assert!(or.evaluate(&row).unwrap());

        let mut not = NotExpr::new(Box::new(ComparisonExpr::eq("a", Value::integer(1))));
        not.prepare_for_schema(&schema).unwrap();
        assert!(!not.evaluate(&row).unwrap());

        assert!(ConstBoolExpr::new(true).evaluate(&row).unwrap());
        assert!(!ConstBoolExpr::new(false).evaluate(&row).unwrap());
    }
}
