//! The double-checked lazy instance cell.
//!
//! [`InstanceCell<T>`] holds at most one constructed `Shared<T>` and guarantees
//! that the constructor runs exactly once per successful lifetime, no matter
//! how many threads race on the first access.
//!
//! # Overview
//!
//! The cell is the classic check / lock / re-check structure:
//!
//! 1. **Fast path**: an acquire-load of the phase marker. When the cell is
//!    already `Ready`, the published slot is read and cloned with no lock
//!    taken.
//! 2. **Slow path**: the init mutex is acquired and the phase re-checked,
//!    because several threads can lose the fast-path race together. The first
//!    of them becomes the initializer; the rest wait on a condvar.
//! 3. **Publish**: the initializer writes the slot, then stores `Ready` with
//!    release ordering. The acquire/release pairing ensures no thread can
//!    observe a partially constructed value.
//!
//! The constructor itself runs *outside* the mutex, so waiters can be timed
//! out and a slow constructor does not hold the lock hostage.
//!
//! # Failure and retry
//!
//! A failing constructor reverts the cell to `Uninitialized`. The error is
//! returned to the initiating caller and to every caller that was already
//! waiting on that attempt; callers arriving afterwards start a fresh attempt.
//! The cell never retries on its own.
//!
//! A constructor must not access the cell it is initializing: the nested call
//! sees `Initializing` and waits on itself, deadlocking (or timing out, for
//! the `_timeout` variants). The registry guards its cells against such cycles
//! with [`ResolveGuard`](crate::resolve_guard::ResolveGuard); standalone cells
//! do not.
//!
//! # Examples
//!
//! ```
//! use solo::cell::InstanceCell;
//!
//! let cell: InstanceCell<Vec<u8>> = InstanceCell::new();
//! assert!(cell.get().is_none());
//!
//! let v = cell.get_or_init(|| vec![1, 2, 3]).unwrap();
//! assert_eq!(*v, vec![1, 2, 3]);
//!
//! // Later calls return the same instance without running the closure.
//! let w = cell.get_or_init(|| unreachable!()).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&v, &w));
//! ```

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::phase::Phase;
use crate::runtime::Shared;

#[cfg(feature = "tracing")]
use tracing::debug;

/// A cell holding at most one lazily constructed shared instance.
///
/// `T` may be unsized (e.g. `dyn Any + Send + Sync`); the registry relies on
/// that to store type-erased cells. For unsized payloads the constructor must
/// hand back an already-shared value via [`get_or_init_shared`](Self::get_or_init_shared).
pub struct InstanceCell<T: ?Sized> {
    name: &'static str,
    phase: AtomicU8,
    /// Number of init-lock acquisitions; stays put once the cell is ready.
    init_locks: AtomicUsize,
    init: Mutex<InitState>,
    init_done: Condvar,
    slot: UnsafeCell<Option<Shared<T>>>,
}

struct InitState {
    /// Error of the attempt that just failed, handed to its waiters.
    failure: Option<Error>,
}

// The slot is only written by the single initializing thread and only read
// after `Ready` is observed, so the cell is as thread-safe as `Arc<T>` itself.
unsafe impl<T: ?Sized + Send + Sync> Send for InstanceCell<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for InstanceCell<T> {}

#[cfg(feature = "debug")]
impl<T: ?Sized> fmt::Debug for InstanceCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCell")
            .field("name", &self.name)
            .field("phase", &self.phase())
            .field("init_locks", &self.init_locks.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: 'static> InstanceCell<T> {
    /// Creates an empty cell named after `T`.
    pub fn new() -> Self {
        Self::with_name(std::any::type_name::<T>())
    }

    /// Returns the instance, constructing it with `ctor` if this is the first
    /// access. `ctor` cannot fail, but the call can still return an error:
    /// a concurrent fallible attempt this caller waited on may have failed.
    pub fn get_or_init<F>(&self, ctor: F) -> Result<Shared<T>, Error>
    where
        F: FnOnce() -> T,
    {
        self.get_or_init_shared(|| Ok(Shared::new(ctor())))
    }

    /// Fallible variant of [`get_or_init`](Self::get_or_init).
    ///
    /// If `ctor` returns an error, the cell reverts to `Uninitialized` and the
    /// error (wrapped as [`ErrorKind::Construction`](crate::error::ErrorKind))
    /// propagates to this caller and to every caller waiting on the attempt.
    pub fn get_or_try_init<F, E>(&self, ctor: F) -> Result<Shared<T>, Error>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        let name = self.name;
        self.get_or_init_shared(move || {
            ctor()
                .map(Shared::new)
                .map_err(|reason| Error::construction_failed(name, reason))
        })
    }

    /// Like [`get_or_try_init`](Self::get_or_try_init), but a caller waiting
    /// on another thread's in-flight construction gives up after `bound` with
    /// [`ErrorKind::InitializationTimeout`](crate::error::ErrorKind). The
    /// cell's state is unaffected by a timeout.
    pub fn get_or_try_init_timeout<F, E>(&self, ctor: F, bound: Duration) -> Result<Shared<T>, Error>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        let name = self.name;
        self.get_or_init_shared_timeout(
            move || {
                ctor()
                    .map(Shared::new)
                    .map_err(|reason| Error::construction_failed(name, reason))
            },
            bound,
        )
    }
}

impl<T: 'static> Default for InstanceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> InstanceCell<T> {
    /// Creates an empty cell with an explicit name used in error messages and
    /// log lines. The registry uses this to label its type-erased cells with
    /// the real registered type.
    pub fn with_name(name: &'static str) -> Self {
        Self {
            name,
            phase: AtomicU8::new(Phase::Uninitialized as u8),
            init_locks: AtomicUsize::new(0),
            init: Mutex::new(InitState { failure: None }),
            init_done: Condvar::new(),
            slot: UnsafeCell::new(None),
        }
    }

    /// The name this cell reports in errors and logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Whether the instance has been constructed and published.
    pub fn is_ready(&self) -> bool {
        self.phase().is_ready()
    }

    /// How many times the init lock has been acquired so far.
    ///
    /// Once the cell is ready this count never grows again: repeated reads go
    /// through the lock-free fast path.
    pub fn init_lock_acquisitions(&self) -> usize {
        self.init_locks.load(Ordering::Relaxed)
    }

    /// Returns the instance if it is already constructed, without initializing.
    pub fn get(&self) -> Option<Shared<T>> {
        self.fast_read()
    }

    /// Core entry point: returns the instance, running `ctor` to produce an
    /// already-shared value if this caller wins the initialization race.
    ///
    /// `ctor` must not access this cell; a re-entrant call waits on its own
    /// in-flight initialization and deadlocks.
    pub fn get_or_init_shared<F>(&self, ctor: F) -> Result<Shared<T>, Error>
    where
        F: FnOnce() -> Result<Shared<T>, Error>,
    {
        self.initialize(ctor, None)
    }

    /// Timeout-bounded variant of [`get_or_init_shared`](Self::get_or_init_shared).
    pub fn get_or_init_shared_timeout<F>(&self, ctor: F, bound: Duration) -> Result<Shared<T>, Error>
    where
        F: FnOnce() -> Result<Shared<T>, Error>,
    {
        self.initialize(ctor, Some(Instant::now() + bound))
    }

    /// Test hook: returns the cell to `Uninitialized`, dropping the published
    /// instance handle (outstanding `Shared<T>` clones keep the old value
    /// alive) and zeroing the lock counter.
    ///
    /// The exclusive borrow makes this safe in the Rust sense, but the hook is
    /// meant for single-threaded test harnesses only; it is not part of the
    /// production state machine, where `Ready` is terminal.
    pub fn force_reset(&mut self) {
        *self.slot.get_mut() = None;
        self.init.get_mut().unwrap().failure = None;
        self.init_locks.store(0, Ordering::Relaxed);
        self.phase.store(Phase::Uninitialized as u8, Ordering::Release);
    }

    fn initialize<F>(&self, ctor: F, deadline: Option<Instant>) -> Result<Shared<T>, Error>
    where
        F: FnOnce() -> Result<Shared<T>, Error>,
    {
        // Fast path: no lock once the instance is published.
        if let Some(value) = self.fast_read() {
            return Ok(value);
        }

        let mut state = self.init.lock().unwrap();
        self.init_locks.fetch_add(1, Ordering::Relaxed);

        loop {
            match Phase::from_u8(self.phase.load(Ordering::Acquire)) {
                Phase::Ready => match self.read_slot() {
                    Some(value) => return Ok(value),
                    // Ready is only ever published after the slot is written.
                    None => unreachable!("cell {} marked Ready with an empty slot", self.name),
                },

                Phase::Uninitialized => {
                    // This caller wins the race and becomes the initializer.
                    state.failure = None;
                    self.phase
                        .store(Phase::Initializing as u8, Ordering::Release);
                    drop(state);

                    return self.run_ctor(ctor);
                }

                Phase::Initializing => {
                    // Another thread owns construction; wait for the attempt
                    // to settle.
                    state = match deadline {
                        None => self.init_done.wait(state).unwrap(),
                        Some(deadline) => {
                            let remaining = deadline.saturating_duration_since(Instant::now());
                            if remaining.is_zero() {
                                return Err(Error::initialization_timeout(self.name));
                            }

                            let (state, timeout) =
                                self.init_done.wait_timeout(state, remaining).unwrap();
                            if timeout.timed_out()
                                && Phase::from_u8(self.phase.load(Ordering::Acquire))
                                    == Phase::Initializing
                            {
                                return Err(Error::initialization_timeout(self.name));
                            }
                            state
                        }
                    };

                    // A failed attempt propagates its error to the callers
                    // that were waiting on it. Callers arriving later see
                    // Uninitialized with the failure already cleared and
                    // retry fresh.
                    if Phase::from_u8(self.phase.load(Ordering::Acquire)) == Phase::Uninitialized {
                        if let Some(failure) = state.failure.clone() {
                            return Err(failure);
                        }
                    }
                }
            }
        }
    }

    fn run_ctor<F>(&self, ctor: F) -> Result<Shared<T>, Error>
    where
        F: FnOnce() -> Result<Shared<T>, Error>,
    {
        #[cfg(feature = "tracing")]
        debug!("constructing instance of {}", self.name);

        // If the constructor unwinds, the guard reverts the phase so waiters
        // are released instead of being stranded in Initializing forever.
        let reset = ResetOnPanic { cell: self };
        let outcome = ctor();
        std::mem::forget(reset);

        let mut state = self.init.lock().unwrap();
        match outcome {
            Ok(value) => {
                // Safety: this thread is the sole initializer, and readers
                // only touch the slot after observing Ready, which is stored
                // below with release ordering.
                unsafe { *self.slot.get() = Some(value.clone()) };
                self.phase.store(Phase::Ready as u8, Ordering::Release);
                self.init_done.notify_all();

                #[cfg(feature = "tracing")]
                debug!("published instance of {}", self.name);

                Ok(value)
            }
            Err(error) => {
                state.failure = Some(error.clone());
                self.phase
                    .store(Phase::Uninitialized as u8, Ordering::Release);
                self.init_done.notify_all();

                Err(error)
            }
        }
    }

    fn fast_read(&self) -> Option<Shared<T>> {
        if Phase::from_u8(self.phase.load(Ordering::Acquire)) == Phase::Ready {
            self.read_slot()
        } else {
            None
        }
    }

    fn read_slot(&self) -> Option<Shared<T>> {
        // Safety: callers have either observed Phase::Ready through an
        // acquire-load, or hold the init mutex while no initializer runs.
        // The slot is written once, before Ready is published, and never
        // written again while shared.
        unsafe { (*self.slot.get()).clone() }
    }
}

struct ResetOnPanic<'a, T: ?Sized> {
    cell: &'a InstanceCell<T>,
}

impl<T: ?Sized> Drop for ResetOnPanic<'_, T> {
    fn drop(&mut self) {
        let mut state = self.cell.init.lock().unwrap();
        state.failure = Some(Error::construction_panicked(self.cell.name));
        self.cell
            .phase
            .store(Phase::Uninitialized as u8, Ordering::Release);
        self.cell.init_done.notify_all();
    }
}
