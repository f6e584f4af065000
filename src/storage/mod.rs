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

//! Storage layer: the RowStore contract, predicate expressions, and the
//! in-memory store used to exercise the executors

pub mod expression;
pub mod mem;
pub mod traits;

pub use expression::{
    AndExpr, ComparisonExpr, ConstBoolExpr, Expression, NotExpr, NullCheckExpr, OrExpr,
};
pub use mem::{seed_rows, MemTable};
pub use traits::{LockMode, RowStore, Scanner, VecScanner};
