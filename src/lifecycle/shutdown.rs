//! Graceful shutdown coordination (C5): fan-out of OS signals and programmatic shutdowns to
//! every subscriber, with replay for subscribers that show up late.
//!
//! Grounded in the teacher crate's `shutdown_signal` (same `tokio::signal::ctrl_c` /
//! `SIGTERM` race, same `#[cfg(unix)]` split for the platforms that don't have `SIGTERM`),
//! generalized from "one waiter, one signal" into a fan-out coordinator because the design
//! needs both OS-triggered and programmatic (`Shutdowner`) shutdown to reach every listener,
//! including `App::run` and any user code that asked to be notified.

use std::sync::{Arc, Mutex};
use tokio::signal;
use tokio::sync::broadcast;

/// What triggered a shutdown: the signal name, or the sentinel `"user"` for a programmatic
/// shutdown via [`Shutdowner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSignal {
    pub signal: String,
    pub exit_code: i32,
}

impl ShutdownSignal {
    pub fn new(signal: impl Into<String>, exit_code: i32) -> Self {
        Self {
            signal: signal.into(),
            exit_code,
        }
    }
}

struct State {
    sender: broadcast::Sender<ShutdownSignal>,
    last: Option<ShutdownSignal>,
    listening: bool,
}

/// Fans out OS signals and programmatic `Shutdowner::shutdown` calls to every subscriber.
/// Subscribers that arrive after a shutdown has already been broadcast still receive it —
/// "replay-on-subscribe" (§3 Invariants) — so a late `Wait()` caller never deadlocks waiting
/// for an event that already happened.
pub struct ShutdownCoordinator {
    state: Mutex<State>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        // `broadcast`'s buffer only bounds how many *unread* messages accumulate per
        // subscriber, not how many subscribers exist; 1 is enough since `wait` always drains
        // immediately and replay is handled separately through `last`.
        let (sender, _) = broadcast::channel(1);
        Self {
            state: Mutex::new(State {
                sender,
                last: None,
                listening: false,
            }),
        }
    }

    /// Idempotently begin listening for the process's configured OS signals (SIGINT,
    /// SIGTERM) on a background task that broadcasts through this coordinator.
    pub fn start(self: &Arc<Self>) {
        let mut state = self.state.lock().unwrap();
        if state.listening {
            return;
        }
        state.listening = true;
        drop(state);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let signal_name = wait_for_os_signal().await;
            this.broadcast(signal_name, 0);
        });
    }

    /// Subscribe to future shutdowns. If one was already broadcast, the returned receiver
    /// observes it as soon as it's polled.
    pub fn wait(&self) -> ShutdownWaiter {
        let mut state = self.state.lock().unwrap();
        if let Some(last) = state.last.clone() {
            return ShutdownWaiter::Ready(last);
        }
        ShutdownWaiter::Pending(state.sender.subscribe())
    }

    /// Broadcast a shutdown to every live subscriber and retain it for replay. A second
    /// broadcast overwrites the replay slot — only the most recent shutdown is retained.
    pub fn broadcast(&self, signal: impl Into<String>, exit_code: i32) {
        let event = ShutdownSignal::new(signal, exit_code);
        let mut state = self.state.lock().unwrap();
        state.last = Some(event.clone());
        // `broadcast::Sender::send` fails only when there are zero receivers; a shutdown
        // with no one listening yet is exactly what `last` and replay exist to handle.
        let _ = state.sender.send(event);
    }

    pub fn has_shutdown(&self) -> bool {
        self.state.lock().unwrap().last.is_some()
    }
}

/// A subscription to the shutdown coordinator, returned by [`ShutdownCoordinator::wait`].
pub enum ShutdownWaiter {
    Ready(ShutdownSignal),
    Pending(broadcast::Receiver<ShutdownSignal>),
}

impl ShutdownWaiter {
    /// Resolve to the shutdown signal, whether it already happened or is still pending.
    pub async fn recv(self) -> ShutdownSignal {
        match self {
            ShutdownWaiter::Ready(signal) => signal,
            ShutdownWaiter::Pending(mut rx) => rx
                .recv()
                .await
                .expect("sender is held by the coordinator for its entire lifetime"),
        }
    }
}

/// Programmatic shutdown capability, injected into user code via the container the same way
/// [`super::hooks::Lifecycle`] is. Calling [`Shutdowner::shutdown`] is equivalent to an OS
/// signal arriving, with `"user"` as the signal name.
pub struct Shutdowner {
    coordinator: Arc<ShutdownCoordinator>,
}

impl Shutdowner {
    pub fn new(coordinator: Arc<ShutdownCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Request shutdown with the given exit code (0 unless overridden by `ExitCode`).
    pub fn shutdown(&self, exit_code: i32) {
        self.coordinator.broadcast("user", exit_code);
    }
}

async fn wait_for_os_signal() -> String {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let name = tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    };
    tracing::info!(target: "vessel", "received {name}");
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_existing_subscriber() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let waiter = coordinator.wait();
        coordinator.broadcast("user", 7);
        let signal = waiter.recv().await;
        assert_eq!(signal, ShutdownSignal::new("user", 7));
    }

    #[tokio::test]
    async fn late_subscriber_replays_last_broadcast() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        coordinator.broadcast("user", 1);
        let waiter = coordinator.wait();
        let signal = waiter.recv().await;
        assert_eq!(signal, ShutdownSignal::new("user", 1));
    }

    #[tokio::test]
    async fn second_broadcast_overwrites_replay_slot() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        coordinator.broadcast("user", 1);
        coordinator.broadcast("user", 2);
        let waiter = coordinator.wait();
        let signal = waiter.recv().await;
        assert_eq!(signal, ShutdownSignal::new("user", 2));
    }

    #[tokio::test]
    async fn shutdowner_broadcasts_through_coordinator() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let waiter = coordinator.wait();
        let shutdowner = Shutdowner::new(coordinator.clone());
        shutdowner.shutdown(42);
        assert_eq!(waiter.recv().await, ShutdownSignal::new("user", 42));
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive_broadcast() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let a = coordinator.wait();
        let b = coordinator.wait();
        coordinator.broadcast("user", 3);
        assert_eq!(a.recv().await, ShutdownSignal::new("user", 3));
        assert_eq!(b.recv().await, ShutdownSignal::new("user", 3));
    }
}
