//! Process-wide named user locks backing `GET_LOCK` / `RELEASE_LOCK`.
//!
//! A [`NamedLockManager`] maps a lock name to the session currently holding
//! it. It is an ordinary service object: the engine builds one, shares it as
//! an `Arc`, and tests build isolated instances. There is no cross-process
//! guarantee.
//!
//! Policy:
//! - a session holds at most one named lock; asking for a different name
//!   releases the held one before the new acquisition is attempted, so a
//!   waiting session never holds anything and waits cannot form cycles;
//! - acquisition blocks on a condition variable scoped to the lock name,
//!   bounded by [`LockWait`];
//! - release wakes every waiter of that name and the first one to re-check
//!   the table wins (no fairness);
//! - the session-management collaborator calls
//!   [`NamedLockManager::release_all_held_by`] on disconnect.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use msql_error::{MsqlError, Result};
use msql_types::SessionId;

/// Maximum lock name length accepted by MySQL.
pub const DEFAULT_MAX_NAME_LEN: usize = 64;

/// Tunables for a [`NamedLockManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// Longest accepted lock name, in characters.
    pub max_name_len: usize,
    /// Whether a negative timeout waits forever (otherwise it probes once).
    pub negative_timeout_waits: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_name_len: DEFAULT_MAX_NAME_LEN,
            negative_timeout_waits: true,
        }
    }
}

/// How long an acquisition may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWait {
    /// Single non-blocking probe.
    NoWait,
    /// Block up to the given duration.
    Timeout(Duration),
    /// Block until the lock is released.
    Forever,
}

impl LockWait {
    /// Interpret a SQL timeout argument in seconds.
    ///
    /// `None` (SQL NULL) probes once, `0` probes once, negative values wait
    /// forever unless the config says otherwise, positive values may carry a
    /// fractional part.
    pub fn from_seconds(seconds: Option<f64>, config: &LockConfig) -> Self {
        match seconds {
            None => Self::NoWait,
            Some(s) if s.is_nan() || s == 0.0 => Self::NoWait,
            Some(s) if s < 0.0 => {
                if config.negative_timeout_waits {
                    Self::Forever
                } else {
                    Self::NoWait
                }
            }
            Some(s) => Duration::try_from_secs_f64(s).map_or(Self::Forever, Self::Timeout),
        }
    }
}

/// Result of [`NamedLockManager::get_lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The session now holds the lock (or already did).
    Acquired,
    /// Another session kept the lock past the deadline.
    TimedOut,
}

/// Result of [`NamedLockManager::release_lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The caller held the lock and released it.
    Released,
    /// The lock is held by a different session.
    NotOwner,
    /// No session holds the lock.
    NotFound,
}

#[derive(Debug, Clone, Copy)]
struct HeldLock {
    holder: SessionId,
    acquired_at: Instant,
}

/// Sessions parked on one lock name.
#[derive(Debug)]
struct WaitQueue {
    cond: Arc<Condvar>,
    waiters: usize,
}

#[derive(Debug, Default)]
struct LockState {
    held: HashMap<String, HeldLock>,
    /// Reverse of `held`; one entry per holding session.
    by_session: HashMap<SessionId, String>,
    waiting: HashMap<String, WaitQueue>,
}

impl LockState {
    fn held_name(&self, session: SessionId) -> Option<String> {
        self.by_session.get(&session).cloned()
    }

    /// Enforce the one-lock-per-session policy for `requested`.
    fn check_single_lock(&self, session: SessionId, requested: &str) -> Result<()> {
        match self.held_name(session) {
            Some(held) if held != requested => Err(MsqlError::LockPolicyViolation {
                session: session.get(),
                held,
                requested: requested.to_owned(),
            }),
            _ => Ok(()),
        }
    }

    /// Remove `name` and wake its waiters.
    fn remove_and_notify(&mut self, name: &str) {
        if let Some(lock) = self.held.remove(name) {
            self.by_session.remove(&lock.holder);
        }
        if let Some(queue) = self.waiting.get(name) {
            queue.cond.notify_all();
        }
    }

    fn register_waiter(&mut self, name: &str) -> Arc<Condvar> {
        let queue = self
            .waiting
            .entry(name.to_owned())
            .or_insert_with(|| WaitQueue {
                cond: Arc::new(Condvar::new()),
                waiters: 0,
            });
        queue.waiters += 1;
        Arc::clone(&queue.cond)
    }

    fn unregister_waiter(&mut self, name: &str) {
        if let Entry::Occupied(mut queue) = self.waiting.entry(name.to_owned()) {
            queue.get_mut().waiters -= 1;
            if queue.get().waiters == 0 {
                queue.remove();
            }
        }
    }

    fn take(&mut self, name: &str, session: SessionId) {
        self.held.insert(
            name.to_owned(),
            HeldLock {
                holder: session,
                acquired_at: Instant::now(),
            },
        );
        self.by_session.insert(session, name.to_owned());
    }
}

/// Registry of named locks shared by every session of one engine instance.
pub struct NamedLockManager {
    state: Mutex<LockState>,
    config: LockConfig,
}

impl NamedLockManager {
    /// Create an empty manager with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LockConfig::default())
    }

    /// Create an empty manager.
    #[must_use]
    pub fn with_config(config: LockConfig) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            config,
        }
    }

    /// The manager's tunables.
    pub const fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Reject names MySQL would refuse.
    pub fn validate_name(&self, name: &str) -> Result<()> {
        if name.is_empty() || name.chars().count() > self.config.max_name_len {
            return Err(MsqlError::InvalidLockName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Acquire `name` for `session`, blocking according to `wait`.
    ///
    /// Re-acquiring a lock the session already holds succeeds immediately.
    /// A different lock held by the session is released first.
    pub fn get_lock(
        &self,
        session: SessionId,
        name: &str,
        wait: LockWait,
    ) -> Result<AcquireOutcome> {
        self.validate_name(name)?;
        let deadline = match wait {
            LockWait::Timeout(timeout) => Instant::now().checked_add(timeout),
            LockWait::NoWait => Some(Instant::now()),
            LockWait::Forever => None,
        };

        let mut state = self.state.lock();

        match state.check_single_lock(session, name) {
            Ok(()) => {}
            Err(MsqlError::LockPolicyViolation { held, .. }) => {
                debug!(session = %session, held = %held, requested = name, "releasing previously held named lock");
                state.remove_and_notify(&held);
            }
            Err(other) => return Err(other),
        }

        match state.held.get(name) {
            Some(lock) if lock.holder == session => return Ok(AcquireOutcome::Acquired),
            Some(_) => {}
            None => {
                state.take(name, session);
                debug!(session = %session, lock = name, "named lock acquired");
                return Ok(AcquireOutcome::Acquired);
            }
        }

        if wait == LockWait::NoWait {
            debug!(session = %session, lock = name, "named lock busy, not waiting");
            return Ok(AcquireOutcome::TimedOut);
        }

        let cond = state.register_waiter(name);
        let outcome = loop {
            let timed_out = match deadline {
                Some(deadline) => cond.wait_until(&mut state, deadline).timed_out(),
                None => {
                    cond.wait(&mut state);
                    false
                }
            };
            if !state.held.contains_key(name) {
                state.take(name, session);
                break AcquireOutcome::Acquired;
            }
            if timed_out {
                break AcquireOutcome::TimedOut;
            }
        };
        state.unregister_waiter(name);
        drop(state);

        match outcome {
            AcquireOutcome::Acquired => {
                debug!(session = %session, lock = name, "named lock acquired after wait");
            }
            AcquireOutcome::TimedOut => {
                warn!(session = %session, lock = name, ?wait, "named lock wait timed out");
            }
        }
        Ok(outcome)
    }

    /// Release `name` on behalf of `session`.
    pub fn release_lock(&self, session: SessionId, name: &str) -> ReleaseOutcome {
        let mut state = self.state.lock();
        match state.held.get(name) {
            None => ReleaseOutcome::NotFound,
            Some(lock) if lock.holder != session => ReleaseOutcome::NotOwner,
            Some(lock) => {
                let held_for = lock.acquired_at.elapsed();
                state.remove_and_notify(name);
                debug!(session = %session, lock = name, ?held_for, "named lock released");
                ReleaseOutcome::Released
            }
        }
    }

    /// Release every lock held by `session`; returns how many were held.
    ///
    /// Session teardown hook: the connection lifecycle owner must call this
    /// on disconnect so no lock outlives its session.
    pub fn release_all_held_by(&self, session: SessionId) -> usize {
        let mut state = self.state.lock();
        let Some(name) = state.held_name(session) else {
            return 0;
        };
        state.remove_and_notify(&name);
        drop(state);
        debug!(session = %session, lock = %name, "released all named locks of session");
        1
    }

    /// Session currently holding `name`.
    #[must_use]
    pub fn holder(&self, name: &str) -> Option<SessionId> {
        self.state.lock().held.get(name).map(|lock| lock.holder)
    }

    /// Whether `name` is unheld.
    #[must_use]
    pub fn is_free(&self, name: &str) -> bool {
        !self.state.lock().held.contains_key(name)
    }

    /// Name of the lock held by `session`, if any.
    #[must_use]
    pub fn held_by(&self, session: SessionId) -> Option<String> {
        self.state.lock().held_name(session)
    }

    /// Number of locks currently held.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.state.lock().held.len()
    }

    /// Number of sessions blocked on `name`.
    #[must_use]
    pub fn waiter_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .waiting
            .get(name)
            .map_or(0, |queue| queue.waiters)
    }
}

impl Default for NamedLockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NamedLockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedLockManager")
            .field("held_count", &self.held_count())
            .field("config", &self.config)
            .finish()
    }
}
