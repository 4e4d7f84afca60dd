//! The App controller (C4): the root aggregate that turns an option tree into a running,
//! stoppable program.
//!
//! Grounded in the teacher crate's `lifecycle::Application`/`ApplicationBuilder` — a builder
//! that assembles a container and a lifecycle manager by hand (`on_init`, `on_destroy`, ...)
//! then exposes a single `shutdown()` — generalized into the full construct/start/stop/run
//! cycle the module tree drives automatically instead of fluent builder calls.

use crate::config::ConfigService;
use crate::container::Container;
use crate::error::{Error, Result};
use crate::event::{Event, EventSink};
use crate::lifecycle::{Lifecycle, ShutdownCoordinator, Shutdowner};
use crate::module::{self, Module, ModuleId};
use crate::option::{OptionValue, RecoverPanics, Validate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// The container's dependency graph, rendered as a DOT digraph, resolvable like any other
/// dependency — installed as a built-in provide so a constructor (typically an admin or
/// diagnostics endpoint) can expose it without being handed the container itself.
pub struct DotGraph(pub String);

/// App-wide settings every module can reach through the container: the two timeouts, the
/// validate/panic-recovery flags (mirrored here from the container's own immutable copies,
/// for introspection), and the error handlers `OnError` appends to.
pub struct AppSettings {
    start_timeout: Mutex<Duration>,
    stop_timeout: Mutex<Duration>,
    validate: AtomicBool,
    recover_panics: AtomicBool,
    error_handlers: Mutex<Vec<Arc<dyn Fn(&Error) + Send + Sync>>>,
}

impl AppSettings {
    fn from_config(config: &ConfigService) -> Self {
        Self {
            start_timeout: Mutex::new(config.duration_ms("APP_START_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT)),
            stop_timeout: Mutex::new(config.duration_ms("APP_STOP_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT)),
            validate: AtomicBool::new(false),
            recover_panics: AtomicBool::new(false),
            error_handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn start_timeout(&self) -> Duration {
        *self.start_timeout.lock().unwrap()
    }

    pub fn stop_timeout(&self) -> Duration {
        *self.stop_timeout.lock().unwrap()
    }

    pub fn is_validate(&self) -> bool {
        self.validate.load(Ordering::SeqCst)
    }

    pub fn recover_panics(&self) -> bool {
        self.recover_panics.load(Ordering::SeqCst)
    }

    pub(crate) fn set_start_timeout(&self, timeout: Duration) {
        *self.start_timeout.lock().unwrap() = timeout;
    }

    pub(crate) fn set_stop_timeout(&self, timeout: Duration) {
        *self.stop_timeout.lock().unwrap() = timeout;
    }

    pub(crate) fn set_validate(&self, value: bool) {
        self.validate.store(value, Ordering::SeqCst);
    }

    pub(crate) fn set_recover_panics(&self, value: bool) {
        self.recover_panics.store(value, Ordering::SeqCst);
    }

    pub(crate) fn add_error_handler(&self, handler: Arc<dyn Fn(&Error) + Send + Sync>) {
        self.error_handlers.lock().unwrap().push(handler);
    }

    fn dispatch(&self, err: &Error) {
        for handler in self.error_handlers.lock().unwrap().iter() {
            handler(err);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RunState {
    NotStarted,
    Started,
    Stopped,
}

/// The root aggregate produced by [`App::new`]/[`App::with_module`]. Owns the container, the
/// lifecycle hook sequence, and the shutdown coordinator; `Start`/`Stop`/`Run` drive all
/// three. Construction never panics on user error — it's captured in [`App::err`] and
/// surfaced the first time `Start` is called.
pub struct App {
    container: Arc<Container>,
    lifecycle: Arc<Lifecycle>,
    shutdown: Arc<ShutdownCoordinator>,
    settings: Arc<AppSettings>,
    sink: Arc<EventSink>,
    root: ModuleId,
    err: Option<Error>,
    state: Mutex<RunState>,
    exit_hook: Box<dyn Fn(i32) + Send + Sync>,
}

impl App {
    /// Build an App from a flat option list, implicitly wrapped in an unnamed root module.
    pub fn new(options: Vec<Box<dyn OptionValue>>) -> Self {
        Self::build(Module::new("root", options))
    }

    /// Build an App from an already-nested module tree.
    pub fn with_module(root: Module) -> Self {
        Self::build(root)
    }

    /// Override what `Run` does with a non-zero exit code once Stop has returned. Defaults to
    /// `std::process::exit`; tests substitute a no-op to observe the returned code instead of
    /// tearing down the test process.
    pub fn on_exit(mut self, hook: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit_hook = Box::new(hook);
        self
    }

    /// The error accumulated while building the graph, if any. `Start` returns this same
    /// error immediately rather than attempting to run hooks against a half-wired graph.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Render the container's dependency graph as a DOT digraph, same rendering an `Invoke`
    /// failure would carry.
    pub fn visualize(&self) -> String {
        self.container.visualize()
    }

    /// Pull an already-wired value back out of the container without a full `Invoke` — an
    /// escape hatch for code that predates this runtime or for tests that just want to
    /// inspect what got built. Only meaningful once the graph is known-good: after a
    /// successful `Start`, or under `Validate`, where — consistent with `Validate` never
    /// running a constructor — it only confirms `T` is reachable and reports that no value
    /// actually exists to return. Resolving before either would observe a container that's
    /// still being wired.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        if self.settings.is_validate() {
            self.container.check_reachable::<T>()?;
            return Err(Error::option_misuse(format!(
                "{} is reachable, but Validate mode never constructs a value to return",
                std::any::type_name::<T>()
            )));
        }
        let started = matches!(*self.state.lock().unwrap(), RunState::Started | RunState::Stopped);
        if !started {
            return Err(Error::option_misuse("resolve called before Start succeeded"));
        }
        self.container.resolve::<T>(self.root)
    }

    fn build(root: Module) -> Self {
        let config = ConfigService::from_env();
        let settings = AppSettings::from_config(&config);

        // Validate/RecoverPanics must be known at `Container::new` time, before anything else
        // touches the container, so they're picked out of the root's own options here rather
        // than through the normal resolve-an-AppSettings-dependency path every other
        // top-level-only option uses.
        let mut dry_run = false;
        let mut recover_panics = false;
        for option in root.top_level_options() {
            if option.as_any().downcast_ref::<Validate>().is_some() {
                dry_run = true;
            }
            if option.as_any().downcast_ref::<RecoverPanics>().is_some() {
                recover_panics = true;
            }
        }
        settings.set_validate(dry_run);
        settings.set_recover_panics(recover_panics);

        let container = Arc::new(Container::new(dry_run, recover_panics));
        let sink = Arc::new(EventSink::buffering());
        let bootstrap = ModuleId::next();

        container.register_value(settings);
        let settings = container
            .resolve::<AppSettings>(bootstrap)
            .expect("AppSettings was just registered as an instance");

        container.register_value(Lifecycle::new());
        let lifecycle = container
            .resolve::<Lifecycle>(bootstrap)
            .expect("Lifecycle was just registered as an instance");

        container.register_value(ShutdownCoordinator::new());
        let shutdown = container
            .resolve::<ShutdownCoordinator>(bootstrap)
            .expect("ShutdownCoordinator was just registered as an instance");

        container.register_value(Shutdowner::new(Arc::clone(&shutdown)));

        let graph_container = Arc::clone(&container);
        let _ = container.provide_erased(
            bootstrap,
            false,
            crate::container::erase_provide(move || DotGraph(graph_container.visualize())),
        );

        let (err, root_id) = match module::apply_tree(&root, &container, &sink) {
            Ok(tree) => (None, tree.root()),
            Err(e) => (Some(e), bootstrap),
        };

        if !sink.is_attached() {
            sink.flush_to_fallback();
        }

        if let Some(e) = &err {
            settings.dispatch(e);
        }
        // The container stays unfrozen here even on failure — Start is the only place that
        // freezes it, and a failed App never reaches Start successfully anyway.

        Self {
            container,
            lifecycle,
            shutdown,
            settings,
            sink,
            root: root_id,
            err,
            state: Mutex::new(RunState::NotStarted),
            exit_hook: Box::new(|code| std::process::exit(code)),
        }
    }

    /// Run onStart hooks in registration order, bounded by `StartTimeout`. Single-shot: a
    /// second call after a successful Start returns an error; a call while App failed to
    /// build returns the construction error immediately without touching the lifecycle.
    pub async fn start(&self) -> Result<()> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }

        {
            let mut state = self.state.lock().unwrap();
            match *state {
                RunState::NotStarted => *state = RunState::Started,
                RunState::Started | RunState::Stopped => {
                    return Err(Error::option_misuse("App already started"));
                }
            }
        }

        self.shutdown.start();

        let deadline = Instant::now() + self.settings.start_timeout();
        let begin = Instant::now();
        let result = self.lifecycle.start(Some(deadline), &self.sink).await;
        match &result {
            Ok(()) => {
                self.sink.emit(Event::Started { elapsed: begin.elapsed() });
                self.container.freeze();
            }
            Err(e) => {
                self.sink.emit(Event::StartFailed { error: e.to_string() });
            }
        }
        result
    }

    /// Run onStop hooks in reverse registration order, bounded by `StopTimeout`. A call
    /// before Start ever succeeded is a no-op; a second call after a successful Stop is also
    /// a no-op, both returning `Ok(())`.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                RunState::NotStarted | RunState::Stopped => return Ok(()),
                RunState::Started => *state = RunState::Stopped,
            }
        }

        let deadline = Instant::now() + self.settings.stop_timeout();
        let result = self.lifecycle.stop(Some(deadline), &self.sink).await;
        self.sink.emit(Event::Stopped {
            err: result.as_ref().err().map(ToString::to_string),
        });
        result
    }

    /// Start, block until a shutdown signal or `Shutdowner::shutdown` arrives, then Stop.
    /// Returns the shutdown signal's exit code, or 1 if Start or Stop failed. If the final
    /// code is non-zero, the exit hook (`std::process::exit` by default) is invoked with it.
    pub async fn run(&self) -> i32 {
        let code = self.run_inner().await;
        if code != 0 {
            (self.exit_hook)(code);
        }
        code
    }

    async fn run_inner(&self) -> i32 {
        if self.start().await.is_err() {
            return 1;
        }

        let signal = self.shutdown.wait().recv().await;
        self.sink.emit(Event::ShutdownSignalReceived {
            signal: signal.signal.clone(),
        });

        let stop_failed = self.stop().await.is_err();
        // A non-zero programmatic exit code always wins: Stop failing during an orderly
        // shutdown the caller already requested a specific code for shouldn't be reported as
        // an anonymous failure instead of that code.
        if signal.exit_code != 0 {
            return signal.exit_code;
        }
        if stop_failed {
            return 1;
        }
        signal.exit_code
    }
}

/// Build the App in dry-run mode and return its construction error, if any, without ever
/// running a constructor, hook, or invoke's side effects. Invokes still execute in dry-run —
/// they're checked for graph reachability only — so an invoked function must not rely on
/// being skipped.
pub fn validate_app(mut options: Vec<Box<dyn OptionValue>>) -> Result<()> {
    options.push(Box::new(Validate::new()));
    match App::new(options).err() {
        Some(e) => Err(e.clone()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{Invoke, Provide, StartTimeout, StopTimeout};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    struct Greeting(String);

    #[tokio::test]
    async fn start_then_stop_succeeds_on_empty_app() {
        let app = App::new(vec![]);
        assert!(app.err().is_none());
        app.start().await.unwrap();
        app.stop().await.unwrap();
    }

    #[tokio::test]
    async fn second_start_after_success_errors() {
        let app = App::new(vec![]);
        app.start().await.unwrap();
        let err = app.start().await.unwrap_err();
        assert!(matches!(err, Error::OptionMisuse { .. }));
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let app = App::new(vec![]);
        app.stop().await.unwrap();
    }

    #[tokio::test]
    async fn invoke_runs_after_provide_and_sees_the_lifecycle() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_invoke = Arc::clone(&ran);
        let app = App::new(vec![
            Box::new(Provide::new(|| Greeting("hi".into()))),
            Box::new(Invoke::new(move |g: Arc<Greeting>| {
                assert_eq!(g.0, "hi");
                ran_invoke.fetch_add(1, Ordering::SeqCst);
            })),
        ]);
        assert!(app.err().is_none());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validate_app_never_constructs() {
        let err = validate_app(vec![Box::new(Provide::new(|| {
            panic!("constructors must not run under ValidateApp");
            #[allow(unreachable_code)]
            Greeting(String::new())
        }))]);
        assert!(err.is_ok());
    }

    #[tokio::test]
    async fn validate_app_reports_missing_dependency() {
        let err = validate_app(vec![Box::new(Invoke::new(|_g: Arc<Greeting>| {}))]);
        assert!(matches!(err, Err(Error::DependencyNotFound { .. })));
    }

    #[tokio::test]
    async fn option_misuse_on_child_module_surfaces_as_build_error() {
        let child = Module::new("child", vec![Box::new(StopTimeout(StdDuration::from_secs(1)))]);
        let root = Module::new("root", vec![]).with_child(child);
        let app = App::with_module(root);
        assert!(matches!(app.err(), Some(Error::OptionMisuse { .. } | Error::Multiple(_))));
        let err = app.start().await.unwrap_err();
        assert!(matches!(err, Error::OptionMisuse { .. } | Error::Multiple(_)));
    }

    #[tokio::test]
    async fn start_timeout_is_honored() {
        let app = App::new(vec![
            Box::new(StartTimeout(StdDuration::from_millis(20))),
            Box::new(Provide::new(|lifecycle: Arc<Lifecycle>| {
                lifecycle.append(
                    "slow",
                    Some(crate::lifecycle::box_hook(|| async {
                        tokio::time::sleep(StdDuration::from_millis(200)).await;
                        Ok(())
                    })),
                    None,
                );
                Greeting("hi".into())
            })),
            Box::new(Invoke::new(|_g: Arc<Greeting>| {})),
        ]);
        let err = app.start().await.unwrap_err();
        assert!(matches!(err, Error::Deadline { .. }));
    }

    #[tokio::test]
    async fn run_returns_the_programmatic_shutdown_exit_code() {
        // The invoke runs during construction, well before `run` ever subscribes to the
        // coordinator — exercising the replay path (§3: late subscribers still see it).
        let exited = Arc::new(AtomicUsize::new(99));
        let exited_hook = Arc::clone(&exited);
        let app = App::new(vec![Box::new(Invoke::new(|shutdowner: Arc<Shutdowner>| {
            shutdowner.shutdown(7);
        }))])
        .on_exit(move |code| exited_hook.store(code as usize, Ordering::SeqCst));

        let code = app.run().await;
        assert_eq!(code, 7);
        assert_eq!(exited.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn resolve_before_start_errors() {
        let app = App::new(vec![Box::new(Provide::new(|| Greeting("hi".into())))]);
        let err = app.resolve::<Greeting>().unwrap_err();
        assert!(matches!(err, Error::OptionMisuse { .. }));
    }

    #[tokio::test]
    async fn resolve_after_start_returns_the_wired_value() {
        let app = App::new(vec![Box::new(Provide::new(|| Greeting("hi".into())))]);
        app.start().await.unwrap();
        let greeting = app.resolve::<Greeting>().unwrap();
        assert_eq!(greeting.0, "hi");
    }

    #[tokio::test]
    async fn resolve_under_validate_checks_reachability_without_constructing() {
        let app = App::new(vec![
            Box::new(Validate::new()),
            Box::new(Provide::new(|| {
                panic!("constructors must not run under Validate");
                #[allow(unreachable_code)]
                Greeting(String::new())
            })),
        ]);
        let err = app.resolve::<Greeting>().unwrap_err();
        assert!(matches!(err, Error::OptionMisuse { .. }));
    }

    #[tokio::test]
    async fn resolve_under_validate_still_reports_a_missing_dependency() {
        struct NeverProvided;
        let app = App::new(vec![Box::new(Validate::new())]);
        let err = app.resolve::<NeverProvided>().unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound { .. }));
    }
}
