//! The option value model: the small set of primitives modules and the app are built from.
//!
//! Every option is a value implementing [`OptionValue`]; applying one mutates the container
//! (or, for the handful of app-wide settings, a shared [`crate::app::AppSettings`] resolved
//! the same way any other dependency is). Options are plain values rather than method calls
//! on a builder so they can be produced by helper functions, stored in a `Vec`, and reapplied
//! — re-supplying the same `Provide` twice is equivalent to providing it twice, exactly as
//! the design doc specifies, because the underlying constructor lives behind a cheaply
//! cloneable `Arc<dyn ErasedProvide>` rather than being consumed on first use.

use crate::app::AppSettings;
use crate::callsite::CallSite;
use crate::container::{
    self, Container, DecorateFn, ErasedDecorate, ErasedInvoke, ErasedProvide, InvokeFn, ProvideFn, ProvideOutcome,
};
use crate::error::Result;
use crate::event::{Event, EventLogger, EventSink};
use crate::module::ModuleId;
use std::sync::Arc;
use std::time::Duration;

/// When an option commits relative to the rest of the tree: `Normal` options (Provide,
/// Decorate, Supply, the app-settings options) commit as they're encountered walking the
/// tree; `LoggerBootstrap` defers until every `Normal` option across the whole tree has
/// committed, so the logger's own constructor can depend on anything any module provided;
/// `Invoke` defers past that, so invokes never race a provider from a sibling module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OptionKind {
    Normal,
    LoggerBootstrap,
    Invoke,
}

/// A single option value: something a [`crate::module::Module`] or top-level `App` can be
/// built from.
pub trait OptionValue: Send + Sync + 'static {
    #[doc(hidden)]
    fn kind(&self) -> OptionKind;
    #[doc(hidden)]
    fn top_level_only(&self) -> bool {
        false
    }
    #[doc(hidden)]
    fn describe(&self) -> String;
    #[doc(hidden)]
    fn apply(&self, container: &Container, requester: ModuleId, sink: &EventSink) -> Result<()>;
    /// Lets [`crate::app::App::build`] pick the handful of settings options
    /// (`Validate`/`RecoverPanics`) out of the root module's option list before the
    /// container exists — those two must be known at `Container::new` time, too early to go
    /// through the normal resolve-an-`AppSettings`-dependency path every other option uses.
    #[doc(hidden)]
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Concatenate option groups into a single flat list. The combinator uber-fx's `fx.Options`
/// offers as a way to bundle related options into a value passed around before being spread
/// into a module — `Vec` concatenation already does that in Rust without reaching for
/// runtime type reflection, so that's what this is.
pub fn options(groups: impl IntoIterator<Item = Vec<Box<dyn OptionValue>>>) -> Vec<Box<dyn OptionValue>> {
    groups.into_iter().flatten().collect()
}

/// Registers a constructor. Re-applying the same `Provide` is equivalent to providing it
/// twice — later registrations for the same type replace earlier ones.
pub struct Provide {
    inner: Arc<dyn ErasedProvide>,
    private: bool,
    trace: CallSite,
}

impl Provide {
    #[track_caller]
    pub fn new<Marker, F>(ctor: F) -> Self
    where
        F: ProvideFn<Marker> + Send + Sync + 'static,
        Marker: Send + Sync + 'static,
    {
        Self {
            inner: container::erase_provide(ctor),
            private: false,
            trace: CallSite::capture(),
        }
    }

    /// Scope the provided type so only this module's subtree can resolve it.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }
}

impl OptionValue for Provide {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }

    fn describe(&self) -> String {
        "Provide".to_string()
    }

    fn apply(&self, container: &Container, requester: ModuleId, sink: &EventSink) -> Result<()> {
        let trace = self.trace;
        let outcome = container.provide_erased(requester, self.private, Arc::clone(&self.inner))?;
        let (_, type_name) = self.inner.produces();
        let event = match outcome {
            ProvideOutcome::Provided => Event::Provided {
                type_name,
                module: format!("{requester:?}"),
                trace: trace.to_string(),
            },
            ProvideOutcome::Replaced => Event::Replaced {
                type_name,
                module: format!("{requester:?}"),
                trace: trace.to_string(),
            },
        };
        sink.emit(event);
        Ok(())
    }
}

/// Registers a function that wraps the already-resolved value of its target type.
pub struct Decorate {
    inner: Arc<dyn ErasedDecorate>,
    trace: CallSite,
}

impl Decorate {
    #[track_caller]
    pub fn new<Marker, F>(f: F) -> Self
    where
        F: DecorateFn<Marker> + Send + Sync + 'static,
        Marker: Send + Sync + 'static,
    {
        Self {
            inner: container::erase_decorate(f),
            trace: CallSite::capture(),
        }
    }
}

impl OptionValue for Decorate {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }

    fn describe(&self) -> String {
        "Decorate".to_string()
    }

    fn apply(&self, container: &Container, requester: ModuleId, sink: &EventSink) -> Result<()> {
        container.decorate_erased(Arc::clone(&self.inner))?;
        let (_, type_name) = self.inner.target();
        sink.emit(Event::Decorated {
            type_name,
            module: format!("{requester:?}"),
            trace: self.trace.to_string(),
        });
        Ok(())
    }
}

/// Registers a function to run once the whole tree's providers and decorators have
/// committed. Invokes run in module-tree order but strictly after every `Provide`/`Decorate`
/// across the entire tree, regardless of which module declared them.
pub struct Invoke {
    inner: Arc<dyn ErasedInvoke>,
    trace: CallSite,
}

impl Invoke {
    #[track_caller]
    pub fn new<Marker, F>(f: F) -> Self
    where
        F: InvokeFn<Marker> + Send + Sync + 'static,
        Marker: Send + Sync + 'static,
    {
        Self {
            inner: container::erase_invoke(f),
            trace: CallSite::capture(),
        }
    }
}

impl OptionValue for Invoke {
    fn kind(&self) -> OptionKind {
        OptionKind::Invoke
    }

    fn describe(&self) -> String {
        "Invoke".to_string()
    }

    fn apply(&self, container: &Container, requester: ModuleId, sink: &EventSink) -> Result<()> {
        let trace = self.trace.to_string();
        sink.emit(Event::Invoking { trace: trace.clone() });
        match container.invoke_erased(requester, &self.inner) {
            Ok(()) => {
                sink.emit(Event::Invoked { trace });
                Ok(())
            }
            Err(e) => {
                sink.emit(Event::InvokeFailed { trace, error: e.to_string() });
                Err(e.with_graph(container.visualize()))
            }
        }
    }
}

/// Registers an already-constructed value directly, bypassing the constructor-resolution
/// machinery entirely. Used for values with no interesting dependencies of their own —
/// configuration loaded before the app starts, test doubles.
pub struct Supply<T> {
    value: Mutex<Option<T>>,
}

use std::sync::Mutex;

impl<T: Send + Sync + 'static> Supply<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }
}

impl<T: Send + Sync + 'static> OptionValue for Supply<T> {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }

    fn describe(&self) -> String {
        format!("Supply<{}>", std::any::type_name::<T>())
    }

    fn apply(&self, container: &Container, requester: ModuleId, sink: &EventSink) -> Result<()> {
        if let Some(value) = self.value.lock().unwrap().take() {
            container.register_value(value);
        }
        sink.emit(Event::Supplied {
            type_name: std::any::type_name::<T>(),
            module: format!("{requester:?}"),
        });
        Ok(())
    }
}

/// Attach a custom event logger. Construction is DI-resolved like a `Provide`, so the
/// logger's constructor can depend on other provided types; if it fails, the fallback
/// console logger is used instead and a `CustomLoggerFailed` event is emitted through it —
/// never fatal to the app (C6).
pub struct WithLogger {
    #[allow(clippy::type_complexity)]
    inner: Arc<dyn Fn(&Container, ModuleId) -> Result<Arc<dyn EventLogger>> + Send + Sync>,
}

impl WithLogger {
    pub fn new<Marker, F, L>(ctor: F) -> Self
    where
        F: ProvideFn<Marker, Output = L> + Send + Sync + 'static,
        L: EventLogger + 'static,
        Marker: Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |container, requester| {
                ctor.call(container, requester)
                    .map(|logger| Arc::new(logger) as Arc<dyn EventLogger>)
            }),
        }
    }
}

impl OptionValue for WithLogger {
    fn kind(&self) -> OptionKind {
        OptionKind::LoggerBootstrap
    }

    fn top_level_only(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "WithLogger".to_string()
    }

    fn apply(&self, container: &Container, requester: ModuleId, sink: &EventSink) -> Result<()> {
        match (self.inner)(container, requester) {
            Ok(logger) => {
                sink.attach(logger);
                sink.emit(Event::CustomLoggerAttached);
            }
            Err(e) => {
                sink.flush_to_fallback();
                sink.emit(Event::CustomLoggerFailed { error: e.to_string() });
            }
        }
        Ok(())
    }
}

/// Deprecated alias kept for compatibility with code migrated from the pre-`WithLogger` API.
/// Behaves identically to [`WithLogger`] but its constructor takes no dependencies.
#[deprecated(note = "use WithLogger, which supports dependency-resolved loggers")]
pub struct Logger {
    inner: Arc<dyn EventLogger>,
}

#[allow(deprecated)]
impl Logger {
    pub fn new(logger: impl EventLogger + 'static) -> Self {
        Self {
            inner: Arc::new(logger),
        }
    }
}

#[allow(deprecated)]
impl OptionValue for Logger {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }

    fn top_level_only(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "Logger".to_string()
    }

    fn apply(&self, _container: &Container, _requester: ModuleId, sink: &EventSink) -> Result<()> {
        sink.attach(Arc::clone(&self.inner));
        sink.emit(Event::CustomLoggerAttached);
        Ok(())
    }
}

/// Override the default start timeout (§2).
pub struct StartTimeout(pub Duration);

impl OptionValue for StartTimeout {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }
    fn top_level_only(&self) -> bool {
        true
    }
    fn describe(&self) -> String {
        "StartTimeout".to_string()
    }
    fn apply(&self, container: &Container, requester: ModuleId, _sink: &EventSink) -> Result<()> {
        let settings = container.resolve::<AppSettings>(requester)?;
        settings.set_start_timeout(self.0);
        Ok(())
    }
}

/// Override the default stop timeout (§2).
pub struct StopTimeout(pub Duration);

impl OptionValue for StopTimeout {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }
    fn top_level_only(&self) -> bool {
        true
    }
    fn describe(&self) -> String {
        "StopTimeout".to_string()
    }
    fn apply(&self, container: &Container, requester: ModuleId, _sink: &EventSink) -> Result<()> {
        let settings = container.resolve::<AppSettings>(requester)?;
        settings.set_stop_timeout(self.0);
        Ok(())
    }
}

/// Build the app in dry-run mode: validate the dependency graph and run no constructors,
/// hooks, or invokes.
pub struct Validate;

impl Validate {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Validate {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionValue for Validate {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }
    fn top_level_only(&self) -> bool {
        true
    }
    fn describe(&self) -> String {
        "Validate".to_string()
    }
    fn apply(&self, container: &Container, requester: ModuleId, _sink: &EventSink) -> Result<()> {
        let settings = container.resolve::<AppSettings>(requester)?;
        settings.set_validate(true);
        Ok(())
    }
}

/// Catch panics inside constructors and hooks, converting them into
/// [`crate::error::Error::ConstructorPanic`]/`Hook` errors instead of unwinding the whole
/// app.
pub struct RecoverPanics;

impl RecoverPanics {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RecoverPanics {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionValue for RecoverPanics {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }
    fn top_level_only(&self) -> bool {
        true
    }
    fn describe(&self) -> String {
        "RecoverPanics".to_string()
    }
    fn apply(&self, container: &Container, requester: ModuleId, _sink: &EventSink) -> Result<()> {
        let settings = container.resolve::<AppSettings>(requester)?;
        settings.set_recover_panics(true);
        Ok(())
    }
}

/// Register a handler invoked with any error accumulated before Start (option misuse,
/// missing dependency, invoke failure). Handlers run in registration order; they observe
/// the error but can't suppress it — `App::err()` still reports it afterward.
pub struct OnError {
    handler: Arc<dyn Fn(&crate::error::Error) + Send + Sync>,
}

impl OnError {
    pub fn new(handler: impl Fn(&crate::error::Error) + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl OptionValue for OnError {
    fn kind(&self) -> OptionKind {
        OptionKind::Normal
    }
    fn top_level_only(&self) -> bool {
        true
    }
    fn describe(&self) -> String {
        "OnError".to_string()
    }
    fn apply(&self, container: &Container, requester: ModuleId, _sink: &EventSink) -> Result<()> {
        let settings = container.resolve::<AppSettings>(requester)?;
        settings.add_error_handler(Arc::clone(&self.handler));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSink;

    fn root() -> ModuleId {
        ModuleId::for_test(0)
    }

    #[test]
    fn options_flattens_groups_in_order() {
        struct Seen(&'static str);
        let flat = options([
            vec![Box::new(Supply::new(Seen("a"))) as Box<dyn OptionValue>],
            vec![Box::new(Supply::new(Seen("b"))) as Box<dyn OptionValue>],
        ]);
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn provide_emits_provided_then_replaced() {
        struct Thing;
        let container = Container::new(false, false);
        container.register_module(root(), None);
        let sink = EventSink::buffering();
        Provide::new(|| Thing).apply(&container, root(), &sink).unwrap();
        Provide::new(|| Thing).apply(&container, root(), &sink).unwrap();
    }
}
