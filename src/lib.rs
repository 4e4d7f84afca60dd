//! # vessel
//!
//! A dependency-injection application runtime for long-lived service processes: declare what
//! your program needs with [`Provide`](option::Provide)/[`Invoke`](option::Invoke)/
//! [`Decorate`](option::Decorate), group it into [`Module`]s, and let [`App`] wire the graph,
//! run it under ordered, timeout-bounded startup and shutdown hooks, and park on an OS signal
//! or a programmatic [`Shutdowner`] until it's time to unwind.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vessel::prelude::*;
//! use std::sync::Arc;
//!
//! struct Database;
//!
//! impl Database {
//!     fn connect(lifecycle: Arc<Lifecycle>) -> Self {
//!         lifecycle.append(
//!             "database",
//!             Some(box_hook(|| async { Ok(()) })),
//!             Some(box_hook(|| async { Ok(()) })),
//!         );
//!         Database
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = App::new(vec![
//!         Box::new(Provide::new(Database::connect)),
//!         Box::new(Invoke::new(|_db: Arc<Database>| {})),
//!     ]);
//!
//!     std::process::exit(app.run().await);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`container`] — the typed DI container: `provide`/`decorate`/`invoke` resolution, scope
//!   enforcement, and DOT-graph rendering.
//! - [`module`] — the option tree, nesting and private scoping before options reach the
//!   container.
//! - [`option`] — the option value model: `Provide`, `Decorate`, `Invoke`, `Supply`,
//!   `WithLogger`, and the handful of app-wide settings options.
//! - [`lifecycle`] — the ordered start/stop hook sequence, its timeout executor, and the
//!   shutdown coordinator.
//! - [`app`] — the root aggregate, [`App`], tying the above together.
//! - [`event`] — structured lifecycle events and the pluggable logger that receives them.
//! - [`error`] — the crate-wide error taxonomy.
//! - [`config`] — the environment-backed configuration snapshot used for timeout defaults.
//! - [`callsite`] — call-site capture for diagnostics, the `#[track_caller]`-based substitute
//!   for runtime reflection.

pub mod app;
pub mod callsite;
pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod module;
pub mod option;

pub use app::{validate_app, App, AppSettings, DotGraph};
pub use container::Container;
pub use error::{Error, HasGraph, Result};
pub use event::{ConsoleLogger, Event, EventLogger};
pub use lifecycle::{
    box_hook, BoxFuture, HookFn, Lifecycle, ShutdownCoordinator, ShutdownSignal, ShutdownWaiter, Shutdowner,
};
pub use module::Module;
#[allow(deprecated)]
pub use option::Logger;
pub use option::{
    options, Decorate, Invoke, OnError, OptionValue, Provide, RecoverPanics, StartTimeout, StopTimeout, Supply,
    Validate, WithLogger,
};

/// Prelude module for convenient imports.
///
/// ```
/// use vessel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::{validate_app, App, AppSettings, DotGraph};
    pub use crate::container::Container;
    pub use crate::error::{Error, HasGraph, Result};
    pub use crate::event::{ConsoleLogger, Event, EventLogger};
    pub use crate::lifecycle::{
        box_hook, BoxFuture, HookFn, Lifecycle, ShutdownCoordinator, ShutdownSignal, ShutdownWaiter, Shutdowner,
    };
    pub use crate::module::Module;
    #[allow(deprecated)]
    pub use crate::option::Logger;
    pub use crate::option::{
        options, Decorate, Invoke, OnError, OptionValue, Provide, RecoverPanics, StartTimeout, StopTimeout, Supply,
        Validate, WithLogger,
    };
    pub use std::sync::Arc;
}
