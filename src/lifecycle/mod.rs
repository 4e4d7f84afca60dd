//! Lifecycle management: the ordered start/stop hook sequence (C1), the timeout executor
//! that bounds each hook (C2), and the shutdown coordinator that fans out OS signals and
//! programmatic shutdown requests (C5).
//!
//! ```text
//! 1. Option application (Provide/Decorate/Supply/Invoke)
//!    ↓
//! 2. Constructors run, registering hooks with Lifecycle as they go    ← C1
//!    ↓
//! 3. App::start() walks hooks forward, each bounded by StartTimeout   ← C1 + C2
//!    ↓
//! [Running — blocked on the shutdown coordinator]                    ← C5
//!    ↓
//! 4. Signal or Shutdowner::shutdown() arrives
//!    ↓
//! 5. App::stop() walks hooks in reverse, each bounded by StopTimeout  ← C1 + C2
//! ```

mod hooks;
mod shutdown;
mod timeout;

pub use hooks::{box_hook, BoxFuture, HookFn, Lifecycle};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal, ShutdownWaiter, Shutdowner};
