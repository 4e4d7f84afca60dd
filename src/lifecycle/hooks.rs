//! The ordered, timeout-bounded, rollback-capable hook sequence (C1).
//!
//! Mirrors the shape of the teacher crate's `LifecycleManager` — an append-only list of
//! named hooks, executed forward on start and in reverse on stop — generalized from four
//! fixed phases (`OnModuleInit`, `OnApplicationBootstrap`, ...) to a single ordered sequence
//! with a high-water mark, which is what lets registration order double as dependency order
//! (§5: "registration order equals construction order equals topological order").

use super::timeout;
use crate::event::{Event, EventSink};
use crate::error::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A boxed, pinned future returned by a hook callback.
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A hook callback, as stored on [`Lifecycle`] after [`box_hook`] wraps a plain async closure.
pub type HookFn = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

/// A single (onStart, onStop) pair. Either callback may be absent; an absent onStart still
/// advances the high-water mark so its onStop (if present) is still eligible to run.
pub(crate) struct Hook {
    pub name: String,
    pub on_start: Option<HookFn>,
    pub on_stop: Option<HookFn>,
}

/// The ordered hook sequence and its high-water mark.
///
/// `Lifecycle` is handed to user code as an injectable dependency (`Arc<Lifecycle>`);
/// constructors call [`Lifecycle::append`] to register their cleanup alongside their own
/// construction, which is how registration order ends up equal to construction order.
pub struct Lifecycle {
    hooks: Mutex<Vec<Hook>>,
    high_water: AtomicUsize,
    frozen: Mutex<bool>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
            high_water: AtomicUsize::new(0),
            frozen: Mutex::new(false),
        }
    }

    /// Append a hook. Always succeeds before Start; panics if called after Start has begun,
    /// since by that point the hook list is being iterated and mutating it would be a bug in
    /// the caller rather than a condition callers are expected to recover from (the original
    /// contract only guarantees ordering "before Start", which in a DI graph means "during
    /// construction"). Build `on_start`/`on_stop` with [`box_hook`].
    pub fn append(&self, name: impl Into<String>, on_start: Option<HookFn>, on_stop: Option<HookFn>) {
        let frozen = self.frozen.lock().unwrap();
        assert!(!*frozen, "Lifecycle::append called after Start");
        self.hooks.lock().unwrap().push(Hook {
            name: name.into(),
            on_start,
            on_stop,
        });
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.lock().unwrap().len()
    }

    /// Run pending onStart callbacks in append order under a shared deadline. On the first
    /// failure, roll back by invoking onStop for every hook started so far (including this
    /// one) and return the start error, combined with any rollback error.
    pub(crate) async fn start(&self, deadline: Option<Instant>, sink: &EventSink) -> Result<()> {
        *self.frozen.lock().unwrap() = true;
        let started = self.high_water.load(Ordering::SeqCst);
        let names: Vec<(String, Option<HookFn>)> = {
            let hooks = self.hooks.lock().unwrap();
            hooks[started..]
                .iter()
                .map(|h| (h.name.clone(), h.on_start.clone()))
                .collect()
        };

        for (i, (name, on_start)) in names.into_iter().enumerate() {
            let index = started + i;
            sink.emit(Event::OnStartHookExecuting {
                name: name.clone(),
                call_site: name.clone(),
            });
            let begin = Instant::now();
            let result = match on_start {
                Some(f) => timeout::execute(deadline, &name, f()).await,
                None => Ok(()),
            };
            let elapsed = begin.elapsed();
            if result.is_ok() {
                self.high_water.store(index + 1, Ordering::SeqCst);
            }
            sink.emit(Event::OnStartHookExecuted {
                name: name.clone(),
                call_site: name.clone(),
                elapsed,
                err: result.as_ref().err().map(ToString::to_string),
            });
            if let Err(start_err) = result {
                let rollback_err = self.stop(deadline, sink).await.err();
                return Err(Error::combine(Some(start_err), rollback_err).expect("start_err is always Some"));
            }
        }
        Ok(())
    }

    /// Run onStop for every hook that was started, in reverse order, accumulating (rather
    /// than short-circuiting on) failures. Resets the high-water mark to zero.
    pub(crate) async fn stop(&self, deadline: Option<Instant>, sink: &EventSink) -> Result<()> {
        let started = self.high_water.swap(0, Ordering::SeqCst);
        let names: Vec<(String, Option<HookFn>)> = {
            let hooks = self.hooks.lock().unwrap();
            hooks[..started]
                .iter()
                .map(|h| (h.name.clone(), h.on_stop.clone()))
                .collect()
        };

        let mut errors = Vec::new();
        for (name, on_stop) in names.into_iter().rev() {
            sink.emit(Event::OnStopHookExecuting {
                name: name.clone(),
                call_site: name.clone(),
            });
            let begin = Instant::now();
            let result = match on_stop {
                Some(f) => timeout::execute(deadline, &name, f()).await,
                None => Ok(()),
            };
            let elapsed = begin.elapsed();
            sink.emit(Event::OnStopHookExecuted {
                name: name.clone(),
                call_site: name,
                elapsed,
                err: result.as_ref().err().map(ToString::to_string),
            });
            if let Err(e) = result {
                errors.push(e);
            }
        }

        match Error::fold(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Wrap a plain async closure (`|| async { ... }`) into the boxed form [`Lifecycle::append`]
/// stores.
pub fn box_hook<F, Fut>(f: F) -> HookFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as BoxFuture)
}
