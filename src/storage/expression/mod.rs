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

//! Predicate expressions evaluated against rows
//!
//! WHERE predicates are boolean expressions over a single table's rows.
//! They are prepared once against the table schema (resolving column names
//! to ordinals) and then evaluated per row, both during the planned scan and
//! again during lock-and-recheck.
//!
//! # Expression Types
//!
//! - [`ComparisonExpr`] - Simple comparison (column op value)
//! - [`AndExpr`], [`OrExpr`], [`NotExpr`] - Logical operators
//! - [`ConstBoolExpr`] - Constant TRUE/FALSE
//! - [`NullCheckExpr`] - NULL check (column IS NULL / IS NOT NULL)

pub mod comparison;
pub mod logical;
pub mod null_check;

use std::fmt::Debug;

use crate::core::{Result, Row, Schema};

pub use comparison::ComparisonExpr;
pub use logical::{AndExpr, ConstBoolExpr, NotExpr, OrExpr};
pub use null_check::NullCheckExpr;

/// Boolean expression over one row of the target table
pub trait Expression: Send + Sync + Debug {
    /// Evaluate the expression against a row
    ///
    /// Returns `Ok(true)` if the row matches, `Ok(false)` if it doesn't,
    /// or an error if evaluation fails.
    fn evaluate(&self, row: &Row) -> Result<bool>;

    /// Prepare the expression for a specific schema
    ///
    /// Pre-computes column ordinals for row access. Must be called before
    /// evaluation; `prepare()` on a statement does this for its WHERE clause.
    fn prepare_for_schema(&mut self, schema: &Schema) -> Result<()>;

    /// Check if this expression has been prepared for a schema
    fn is_prepared(&self) -> bool;
}
