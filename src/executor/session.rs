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

//! Session state: cancellation, lock timeout, rights, identity capture
//!
//! A session executes at most one statement at a time; distinct sessions may
//! run concurrently against the same tables. Everything a statement needs
//! from its session is behind interior mutability so executors, collectors
//! and the row store can share one `Arc<Session>`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;

use crate::core::{Error, Result, Value};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Table rights checked before a statement touches a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Right {
    Select,
    Insert,
    Update,
    Delete,
}

impl Right {
    /// The SQL keyword for this right
    pub fn as_str(&self) -> &'static str {
        match self {
            Right::Select => "SELECT",
            Right::Insert => "INSERT",
            Right::Update => "UPDATE",
            Right::Delete => "DELETE",
        }
    }
}

/// Compatibility-mode flags that shape statement behavior
#[derive(Debug, Clone)]
pub struct SessionMode {
    /// Capture the identity value of the last inserted row into
    /// `session.last_identity`
    pub take_inserted_identity: bool,

    /// Unquoted identifiers are stored upper-cased
    pub database_to_upper: bool,

    /// Unquoted identifiers are stored lower-cased
    pub database_to_lower: bool,
}

impl Default for SessionMode {
    fn default() -> Self {
        Self {
            take_inserted_identity: true,
            database_to_upper: true,
            database_to_lower: false,
        }
    }
}

/// A database session
pub struct Session {
    id: u64,
    mode: SessionMode,
    cancelled: AtomicBool,
    lock_timeout: Mutex<Duration>,
    last_identity: Mutex<Value>,
    revoked: RwLock<FxHashSet<(String, Right)>>,
}

impl Session {
    /// Create a session with default mode flags
    pub fn new() -> Self {
        Self::with_mode(SessionMode::default())
    }

    /// Create a session with explicit mode flags
    pub fn with_mode(mode: SessionMode) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            mode,
            cancelled: AtomicBool::new(false),
            lock_timeout: Mutex::new(DEFAULT_LOCK_TIMEOUT),
            last_identity: Mutex::new(Value::null_unknown()),
            revoked: RwLock::new(FxHashSet::default()),
        }
    }

    /// Unique session id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mode flags
    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Request cancellation of the in-flight statement
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Clear the cancellation flag (called when a new statement starts)
    pub fn clear_cancelled(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Raise `Cancelled` if cancellation has been requested
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Lock timeout
    // =========================================================================

    /// Maximum time a statement waits for a row or table lock
    pub fn lock_timeout(&self) -> Duration {
        *self.lock_timeout.lock()
    }

    /// Set the lock wait timeout
    pub fn set_lock_timeout(&self, timeout: Duration) {
        *self.lock_timeout.lock() = timeout;
    }

    // =========================================================================
    // Identity capture
    // =========================================================================

    /// The identity value of the last row inserted by this session
    pub fn last_identity(&self) -> Value {
        self.last_identity.lock().clone()
    }

    /// Record the identity value of an inserted row
    pub fn set_last_identity(&self, value: Value) {
        *self.last_identity.lock() = value;
    }

    // =========================================================================
    // Rights
    // =========================================================================

    /// Check that this session's user holds a right on a table
    pub fn check_table_right(&self, table: &str, right: Right) -> Result<()> {
        if self.revoked.read().contains(&(table.to_string(), right)) {
            Err(Error::access_denied(right.as_str(), table))
        } else {
            Ok(())
        }
    }

    /// Revoke a right on a table for this session's user
    pub fn revoke(&self, table: impl Into<String>, right: Right) {
        self.revoked.write().insert((table.into(), right));
    }

    /// Grant back a previously revoked right
    pub fn grant(&self, table: &str, right: Right) {
        self.revoked.write().remove(&(table.to_string(), right));
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_unique() {
        let a = Session::new();
        let b = Session::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_cancellation() {
        let session = Session::new();
        assert!(session.check_cancelled().is_ok());
        session.cancel();
        assert!(session.is_cancelled());
        assert_eq!(session.check_cancelled(), Err(Error::Cancelled));
        session.clear_cancelled();
        assert!(session.check_cancelled().is_ok());
    }

    #[test]
    fn test_rights() {
        let session = Session::new();
        assert!(session.check_table_right("t", Right::Delete).is_ok());
        session.revoke("t", Right::Delete);
        assert!(matches!(
            session.check_table_right("t", Right::Delete),
            Err(Error::AccessDenied { .. })
        ));
        // other rights unaffected
        assert!(session.check_table_right("t", Right::Update).is_ok());
        session.grant("t", Right::Delete);
        assert!(session.check_table_right("t", Right::Delete).is_ok());
    }

    #[test]
    fn test_last_identity() {
        let session = Session::new();
        assert!(session.last_identity().is_null());
        session.set_last_identity(Value::integer(42));
        assert_eq!(session.last_identity(), Value::integer(42));
    }
}
