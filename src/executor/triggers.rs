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

//! Trigger registration and firing
//!
//! Triggers come in four classes: BEFORE/AFTER x statement/row. BEFORE
//! triggers can veto; a vetoed statement aborts with count 0, a vetoed row
//! is skipped without counting. Row BEFORE triggers for UPDATE and INSERT
//! may mutate the new row in place. Trigger user code is opaque and may
//! block; the executor calls it synchronously.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::core::{Action, Row};

use super::session::Session;

/// Statement-level trigger; a BEFORE trigger returning true vetoes the
/// statement
pub type StatementTriggerFn = dyn Fn(&Session, Action) -> bool + Send + Sync;

/// Row-level BEFORE trigger; returning true vetoes the row. Receives the
/// old row (DELETE/UPDATE) and mutable access to the new row
/// (INSERT/UPDATE).
pub type BeforeRowTriggerFn =
    dyn Fn(&Session, Option<&Row>, Option<&mut Row>) -> bool + Send + Sync;

/// Row-level AFTER trigger; the final flag reports whether the change is
/// being rolled back
pub type AfterRowTriggerFn = dyn Fn(&Session, Option<&Row>, Option<&Row>, bool) + Send + Sync;

type Actions = SmallVec<[Action; 3]>;

struct StatementTrigger {
    actions: Actions,
    callback: Arc<StatementTriggerFn>,
}

struct BeforeRowTrigger {
    actions: Actions,
    callback: Arc<BeforeRowTriggerFn>,
}

struct AfterRowTrigger {
    actions: Actions,
    callback: Arc<AfterRowTriggerFn>,
}

#[derive(Default)]
struct TriggerSetInner {
    before_statement: Vec<StatementTrigger>,
    after_statement: Vec<StatementTrigger>,
    before_row: Vec<BeforeRowTrigger>,
    after_row: Vec<AfterRowTrigger>,
}

/// The triggers registered on one table
///
/// Internally synchronized; registration and firing take `&self`.
#[derive(Default)]
pub struct TriggerSet {
    inner: RwLock<TriggerSetInner>,
}

impl TriggerSet {
    /// Create an empty trigger set
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a statement-level BEFORE trigger
    pub fn add_before_statement(
        &self,
        actions: impl IntoIterator<Item = Action>,
        callback: impl Fn(&Session, Action) -> bool + Send + Sync + 'static,
    ) {
        self.inner.write().before_statement.push(StatementTrigger {
            actions: actions.into_iter().collect(),
            callback: Arc::new(callback),
        });
    }

    /// Register a statement-level AFTER trigger (its return value is ignored)
    pub fn add_after_statement(
        &self,
        actions: impl IntoIterator<Item = Action>,
        callback: impl Fn(&Session, Action) -> bool + Send + Sync + 'static,
    ) {
        self.inner.write().after_statement.push(StatementTrigger {
            actions: actions.into_iter().collect(),
            callback: Arc::new(callback),
        });
    }

    /// Register a row-level BEFORE trigger
    pub fn add_before_row(
        &self,
        actions: impl IntoIterator<Item = Action>,
        callback: impl Fn(&Session, Option<&Row>, Option<&mut Row>) -> bool + Send + Sync + 'static,
    ) {
        self.inner.write().before_row.push(BeforeRowTrigger {
            actions: actions.into_iter().collect(),
            callback: Arc::new(callback),
        });
    }

    /// Register a row-level AFTER trigger
    pub fn add_after_row(
        &self,
        actions: impl IntoIterator<Item = Action>,
        callback: impl Fn(&Session, Option<&Row>, Option<&Row>, bool) + Send + Sync + 'static,
    ) {
        self.inner.write().after_row.push(AfterRowTrigger {
            actions: actions.into_iter().collect(),
            callback: Arc::new(callback),
        });
    }

    // =========================================================================
    // Firing
    // =========================================================================

    /// Fire statement-level triggers for the action.
    ///
    /// Returns true if a BEFORE trigger vetoed the statement. AFTER
    /// triggers cannot veto.
    pub fn fire_statement(&self, session: &Session, action: Action, before: bool) -> bool {
        let callbacks: Vec<Arc<StatementTriggerFn>> = {
            let inner = self.inner.read();
            let list = if before {
                &inner.before_statement
            } else {
                &inner.after_statement
            };
            list.iter()
                .filter(|t| t.actions.contains(&action))
                .map(|t| t.callback.clone())
                .collect()
        };
        let mut vetoed = false;
        for callback in callbacks {
            if callback(session, action) && before {
                vetoed = true;
            }
        }
        vetoed
    }

    /// Whether any row-level trigger is registered for the action
    pub fn fire_row(&self, action: Action) -> bool {
        let inner = self.inner.read();
        inner.before_row.iter().any(|t| t.actions.contains(&action))
            || inner.after_row.iter().any(|t| t.actions.contains(&action))
    }

    /// Fire row-level BEFORE triggers; returns true if any vetoed the row.
    ///
    /// Triggers run in registration order and stop at the first veto.
    pub fn fire_before_row(
        &self,
        session: &Session,
        action: Action,
        old: Option<&Row>,
        new: Option<&mut Row>,
    ) -> bool {
        let callbacks: Vec<Arc<BeforeRowTriggerFn>> = {
            let inner = self.inner.read();
            inner
                .before_row
                .iter()
                .filter(|t| t.actions.contains(&action))
                .map(|t| t.callback.clone())
                .collect()
        };
        let mut new = new;
        for callback in callbacks {
            let new_row = new.as_mut().map(|row| &mut **row);
            if callback(session, old, new_row) {
                return true;
            }
        }
        false
    }

    /// Fire row-level AFTER triggers
    pub fn fire_after_row(
        &self,
        session: &Session,
        action: Action,
        old: Option<&Row>,
        new: Option<&Row>,
        rollback: bool,
    ) {
        let callbacks: Vec<Arc<AfterRowTriggerFn>> = {
            let inner = self.inner.read();
            inner
                .after_row
                .iter()
                .filter(|t| t.actions.contains(&action))
                .map(|t| t.callback.clone())
                .collect()
        };
        for callback in callbacks {
            callback(session, old, new, rollback);
        }
    }
}

impl fmt::Debug for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("TriggerSet")
            .field("before_statement", &inner.before_statement.len())
            .field("after_statement", &inner.after_statement.len())
            .field("before_row", &inner.before_row.len())
            .field("after_row", &inner.after_row.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_statement_veto() {
        let triggers = TriggerSet::new();
        let session = Session::new();
        assert!(!triggers.fire_statement(&session, Action::Delete, true));

        triggers.add_before_statement([Action::Delete], |_, _| true);
        assert!(triggers.fire_statement(&session, Action::Delete, true));
        // only registered actions fire
        assert!(!triggers.fire_statement(&session, Action::Update, true));
        // AFTER cannot veto
        assert!(!triggers.fire_statement(&session, Action::Delete, false));
    }

    #[test]
    fn test_row_triggers() {
        let triggers = TriggerSet::new();
        let session = Session::new();
        assert!(!triggers.fire_row(Action::Update));

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        triggers.add_before_row([Action::Update], move |_, old, new| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(old.is_some());
            // mutate the new row in place
            if let Some(new) = new {
                new.set(0, Value::integer(99)).unwrap();
            }
            false
        });
        triggers.add_after_row([Action::Update], |_, _, _, rollback| {
            assert!(!rollback);
        });

        assert!(triggers.fire_row(Action::Update));
        assert!(!triggers.fire_row(Action::Delete));

        let old = Row::from_values(vec![Value::integer(1)]);
        let mut new = Row::from_values(vec![Value::integer(2)]);
        let vetoed =
            triggers.fire_before_row(&session, Action::Update, Some(&old), Some(&mut new));
        assert!(!vetoed);
        assert_eq!(new[0], Value::integer(99));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        triggers.fire_after_row(&session, Action::Update, Some(&old), Some(&new), false);
    }

    #[test]
    fn test_before_row_veto_short_circuits() {
        let triggers = TriggerSet::new();
        let session = Session::new();
        let second_fired = Arc::new(AtomicUsize::new(0));
        triggers.add_before_row([Action::Delete], |_, _, _| true);
        let counter = second_fired.clone();
        triggers.add_before_row([Action::Delete], move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        });

        let old = Row::from_values(vec![Value::integer(1)]);
        assert!(triggers.fire_before_row(&session, Action::Delete, Some(&old), None));
        assert_eq!(second_fired.load(Ordering::SeqCst), 0);
    }
}
