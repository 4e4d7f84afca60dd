//! Structured lifecycle events and the pluggable logger that receives them.
//!
//! Every state transition the runtime makes — a provide committing, a hook starting,
//! a deadline elapsing, shutdown being requested — is modeled as an [`Event`] and handed to
//! an [`EventLogger`]. The default logger mirrors events to [`tracing`] at appropriate
//! levels and additionally writes a compact line to stderr, matching the teacher crate's
//! habit of pairing structured `tracing` spans with a human-readable console line for local
//! development (see `lifecycle::manager`).
//!
//! Before the user's own logger (if any) is constructed, events are buffered rather than
//! dropped — constructing the logger is itself DI-resolved and can fail, and by the time it
//! fails we may already have emitted several events. On success, the buffer flushes into the
//! real logger; on failure, it flushes into the fallback console logger instead, and the
//! failure itself is reported through the fallback (C6).

use crate::callsite::CallSite;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A single structured event in the application's lifecycle.
#[derive(Debug, Clone)]
pub enum Event {
    Provided { type_name: &'static str, module: String, trace: String },
    Replaced { type_name: &'static str, module: String, trace: String },
    Supplied { type_name: &'static str, module: String },
    Decorated { type_name: &'static str, module: String, trace: String },
    Invoking { trace: String },
    Invoked { trace: String },
    InvokeFailed { trace: String, error: String },
    OnStartHookExecuting { name: String, call_site: String },
    OnStartHookExecuted { name: String, call_site: String, elapsed: Duration, err: Option<String> },
    OnStopHookExecuting { name: String, call_site: String },
    OnStopHookExecuted { name: String, call_site: String, elapsed: Duration, err: Option<String> },
    Started { elapsed: Duration },
    StartFailed { error: String },
    Stopped { err: Option<String> },
    RollingBack { start_failure: String },
    RolledBack { err: Option<String> },
    CustomLoggerAttached,
    CustomLoggerFailed { error: String },
    ShutdownSignalReceived { signal: String },
    Shutdown { exit_code: i32 },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Provided { type_name, module, trace } => {
                write!(f, "PROVIDE\t{type_name}\t{module}\t{trace}")
            }
            Event::Replaced { type_name, module, trace } => {
                write!(f, "REPLACE\t{type_name}\t{module}\t{trace}")
            }
            Event::Supplied { type_name, module } => write!(f, "SUPPLY\t{type_name}\t{module}"),
            Event::Decorated { type_name, module, trace } => {
                write!(f, "DECORATE\t{type_name}\t{module}\t{trace}")
            }
            Event::Invoking { trace } => write!(f, "INVOKING\t{trace}"),
            Event::Invoked { trace } => write!(f, "INVOKE\t{trace}"),
            Event::InvokeFailed { trace, error } => write!(f, "INVOKE_FAILED\t{trace}\t{error}"),
            Event::OnStartHookExecuting { name, call_site } => {
                write!(f, "START_HOOK_EXECUTING\t{name}\t{call_site}")
            }
            Event::OnStartHookExecuted { name, call_site, elapsed, err } => write!(
                f,
                "START_HOOK_EXECUTED\t{name}\t{call_site}\t{elapsed:?}\t{}",
                err.as_deref().unwrap_or("ok")
            ),
            Event::OnStopHookExecuting { name, call_site } => {
                write!(f, "STOP_HOOK_EXECUTING\t{name}\t{call_site}")
            }
            Event::OnStopHookExecuted { name, call_site, elapsed, err } => write!(
                f,
                "STOP_HOOK_EXECUTED\t{name}\t{call_site}\t{elapsed:?}\t{}",
                err.as_deref().unwrap_or("ok")
            ),
            Event::Started { elapsed } => write!(f, "STARTED\t{elapsed:?}"),
            Event::StartFailed { error } => write!(f, "START_FAILED\t{error}"),
            Event::Stopped { err } => write!(f, "STOPPED\t{}", err.as_deref().unwrap_or("ok")),
            Event::RollingBack { start_failure } => write!(f, "ROLLING_BACK\t{start_failure}"),
            Event::RolledBack { err } => write!(f, "ROLLED_BACK\t{}", err.as_deref().unwrap_or("ok")),
            Event::CustomLoggerAttached => write!(f, "CUSTOM_LOGGER_ATTACHED"),
            Event::CustomLoggerFailed { error } => write!(f, "CUSTOM_LOGGER_FAILED\t{error}"),
            Event::ShutdownSignalReceived { signal } => write!(f, "SHUTDOWN_SIGNAL\t{signal}"),
            Event::Shutdown { exit_code } => write!(f, "SHUTDOWN\t{exit_code}"),
        }
    }
}

/// Receiver for lifecycle events. Implement this to route events somewhere other than the
/// console — a metrics pipeline, a JSON log shipper, a test harness collecting events for
/// assertions.
pub trait EventLogger: Send + Sync {
    fn log(&self, event: &Event);
}

/// Mirrors every event to [`tracing`] and to a line on stderr. The logger used when no
/// `WithLogger`/deprecated `Logger` option is supplied, and the fallback used if a custom
/// logger's constructor fails.
#[derive(Default)]
pub struct ConsoleLogger;

impl EventLogger for ConsoleLogger {
    fn log(&self, event: &Event) {
        match event {
            Event::StartFailed { .. } | Event::InvokeFailed { .. } | Event::CustomLoggerFailed { .. } => {
                tracing::error!(target: "vessel", "{event}");
            }
            Event::RollingBack { .. } => tracing::warn!(target: "vessel", "{event}"),
            _ => tracing::info!(target: "vessel", "{event}"),
        }
        eprintln!("[vessel] {event}");
    }
}

enum SinkState {
    Buffering(Vec<Event>),
    Attached(Arc<dyn EventLogger>),
}

/// Owns the currently-attached [`EventLogger`] and buffers events emitted before one is
/// attached. Swapping the logger is a one-shot operation: the first successful
/// `WithLogger`/`Logger` construction wins, matching the "last one wins but only one
/// construction is attempted" semantics in the design doc's discussion of the deprecated
/// `Logger` option.
pub struct EventSink {
    state: Mutex<SinkState>,
}

impl EventSink {
    pub fn buffering() -> Self {
        Self {
            state: Mutex::new(SinkState::Buffering(Vec::new())),
        }
    }

    /// A sink that discards events immediately; used by tests and dry-run validation where
    /// console chatter would just be noise.
    pub fn silent() -> Self {
        Self {
            state: Mutex::new(SinkState::Attached(Arc::new(NullLogger))),
        }
    }

    pub fn emit(&self, event: Event) {
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            SinkState::Buffering(buf) => buf.push(event),
            SinkState::Attached(logger) => logger.log(&event),
        }
    }

    /// Attach the real logger, flushing anything buffered so far into it in order.
    pub fn attach(&self, logger: Arc<dyn EventLogger>) {
        let mut state = self.state.lock().unwrap();
        let buffered = match std::mem::replace(&mut *state, SinkState::Attached(Arc::clone(&logger))) {
            SinkState::Buffering(buf) => buf,
            SinkState::Attached(_) => Vec::new(),
        };
        for event in buffered {
            logger.log(&event);
        }
    }

    /// Flush any buffered events into the console fallback and keep it attached. If a logger
    /// is already attached — the deprecated `Logger` option committing before a later
    /// `WithLogger` fails, say — it's left alone rather than replaced, so a `WithLogger`
    /// failure falls back to that Printer-backed logger instead of the default console one.
    pub fn flush_to_fallback(&self) {
        let mut state = self.state.lock().unwrap();
        if let SinkState::Buffering(buf) = &*state {
            let fallback: Arc<dyn EventLogger> = Arc::new(ConsoleLogger);
            for event in buf {
                fallback.log(event);
            }
            *state = SinkState::Attached(fallback);
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(*self.state.lock().unwrap(), SinkState::Attached(_))
    }
}

struct NullLogger;
impl EventLogger for NullLogger {
    fn log(&self, _event: &Event) {}
}

pub(crate) fn call_site_string(site: CallSite) -> String {
    site.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLogger(Arc<AtomicUsize>);
    impl EventLogger for CountingLogger {
        fn log(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn buffered_events_flush_on_attach() {
        let sink = EventSink::buffering();
        sink.emit(Event::Started { elapsed: Duration::from_millis(1) });
        sink.emit(Event::Started { elapsed: Duration::from_millis(2) });
        let count = Arc::new(AtomicUsize::new(0));
        sink.attach(Arc::new(CountingLogger(count.clone())));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn events_after_attach_go_straight_through() {
        let sink = EventSink::buffering();
        let count = Arc::new(AtomicUsize::new(0));
        sink.attach(Arc::new(CountingLogger(count.clone())));
        sink.emit(Event::Started { elapsed: Duration::from_millis(1) });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn flush_to_fallback_does_not_panic() {
        let sink = EventSink::buffering();
        sink.emit(Event::StartFailed { error: "boom".into() });
        sink.flush_to_fallback();
        assert!(sink.is_attached());
    }

    #[test]
    fn flush_to_fallback_preserves_an_already_attached_logger() {
        let sink = EventSink::buffering();
        let count = Arc::new(AtomicUsize::new(0));
        sink.attach(Arc::new(CountingLogger(count.clone())));
        sink.flush_to_fallback();
        sink.emit(Event::CustomLoggerFailed { error: "boom".into() });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
