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

//! Core types and definitions for Rowforge
//!
//! This module contains the fundamental types used throughout the
//! execution core:
//!
//! - [`DataType`] - SQL data types (INTEGER, TEXT, FLOAT, etc.)
//! - [`Operator`] - Comparison operators (=, !=, >, <, etc.)
//! - [`Action`] / [`ResultOption`] - row-change action and lifecycle snapshot
//! - [`Value`] - Runtime values with type information
//! - [`Row`] / [`RowId`] - A database row and its opaque store pointer
//! - [`Schema`] / [`SchemaColumn`] - Table descriptor
//! - [`Error`] - Error types for all operations

pub mod error;
pub mod row;
pub mod schema;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use row::{Row, RowId};
pub use schema::{ColumnCheck, ColumnDefault, Schema, SchemaBuilder, SchemaColumn};
pub use types::{Action, DataType, Operator, ResultOption};
pub use value::{parse_timestamp, Value};
