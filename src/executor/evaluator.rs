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

//! Scalar expressions evaluated against a row cursor
//!
//! SET-clause right-hand sides, RETURNING projections and FETCH clauses are
//! scalar expressions. Column references resolve to ordinals at prepare
//! time and read from the OLD row during SET evaluation.

use std::fmt;

use crate::core::{Error, Result, Schema, Value};

/// Arithmetic operators for scalar expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
        }
    }
}

/// A scalar expression over one row
#[derive(Debug, Clone)]
pub enum ScalarExpr {
    /// A constant value
    Literal(Value),

    /// A column reference, resolved to an ordinal at prepare time
    Column { name: String, index: Option<usize> },

    /// Binary arithmetic
    Arith {
        op: ArithOp,
        left: Box<ScalarExpr>,
        right: Box<ScalarExpr>,
    },

    /// The DEFAULT marker in a VALUES list: keep the column's default
    Default,
}

impl ScalarExpr {
    /// A literal value
    pub fn literal(value: Value) -> Self {
        ScalarExpr::Literal(value)
    }

    /// A column reference by name
    pub fn column(name: impl Into<String>) -> Self {
        ScalarExpr::Column {
            name: name.into(),
            index: None,
        }
    }

    /// Binary arithmetic over two expressions
    pub fn arith(op: ArithOp, left: ScalarExpr, right: ScalarExpr) -> Self {
        ScalarExpr::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left + right`
    pub fn add(left: ScalarExpr, right: ScalarExpr) -> Self {
        Self::arith(ArithOp::Add, left, right)
    }

    /// `left - right`
    pub fn sub(left: ScalarExpr, right: ScalarExpr) -> Self {
        Self::arith(ArithOp::Sub, left, right)
    }

    /// Whether this expression evaluates to the same value for every row
    pub fn is_constant(&self) -> bool {
        match self {
            ScalarExpr::Literal(_) => true,
            ScalarExpr::Column { .. } | ScalarExpr::Default => false,
            ScalarExpr::Arith { left, right, .. } => left.is_constant() && right.is_constant(),
        }
    }

    /// Resolve column references against a schema
    pub fn prepare(&mut self, schema: &Schema) -> Result<()> {
        match self {
            ScalarExpr::Literal(_) | ScalarExpr::Default => Ok(()),
            ScalarExpr::Column { name, index } => {
                let resolved = schema
                    .column_index_map()
                    .get(&name.to_lowercase())
                    .copied()
                    .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
                *index = Some(resolved);
                Ok(())
            }
            ScalarExpr::Arith { left, right, .. } => {
                left.prepare(schema)?;
                right.prepare(schema)
            }
        }
    }

    /// Evaluate against a row cursor. Constant expressions accept an empty
    /// slice.
    pub fn evaluate(&self, row: &[Value]) -> Result<Value> {
        match self {
            ScalarExpr::Literal(value) => Ok(value.clone()),
            ScalarExpr::Default => Err(Error::internal(
                "DEFAULT marker evaluated outside an insert column list",
            )),
            ScalarExpr::Column { name, index } => {
                let index = index
                    .ok_or_else(|| Error::internal(format!("column '{}' not resolved", name)))?;
                row.get(index)
                    .cloned()
                    .ok_or_else(|| Error::internal(format!("row has no column {}", index)))
            }
            ScalarExpr::Arith { op, left, right } => {
                let left = left.evaluate(row)?;
                let right = right.evaluate(row)?;
                apply_arith(*op, &left, &right)
            }
        }
    }
}

fn apply_arith(op: ArithOp, left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::null_unknown());
    }
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                ArithOp::Add => a.checked_add(*b),
                ArithOp::Sub => a.checked_sub(*b),
                ArithOp::Mul => a.checked_mul(*b),
                ArithOp::Div => {
                    if *b == 0 {
                        return Err(Error::invalid_value("division", "0"));
                    }
                    a.checked_div(*b)
                }
            };
            result.map(Value::Integer).ok_or_else(|| {
                Error::invalid_value(format!("{} {} {}", a, op, b), "integer overflow")
            })
        }
        _ => {
            let a = left.as_float64().ok_or_else(|| {
                Error::type_conversion(left.data_type().to_string(), "FLOAT")
            })?;
            let b = right.as_float64().ok_or_else(|| {
                Error::type_conversion(right.data_type().to_string(), "FLOAT")
            })?;
            Ok(Value::Float(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => {
                    if b == 0.0 {
                        return Err(Error::invalid_value("division", "0"));
                    }
                    a / b
                }
            }))
        }
    }
}
