//! Crate-wide error taxonomy.
//!
//! Every error surfaced by the runtime — option misuse, graph errors, constructor/invoke
//! failures, hook failures, deadline elapses, logger failures — funnels through [`Error`].
//! Multiple errors accumulated during a single phase (stop hooks, rollback) are combined
//! with [`Error::combine`] rather than discarded.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The runtime's error type.
///
/// Variants map directly to the taxonomy in the error-handling design: option misuse, graph
/// errors, constructor/invoke errors, hook errors, deadline errors, and logger errors.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A top-level-only option was applied to a non-root module, or a singleton option was
    /// supplied twice.
    #[error("option misuse: {message}")]
    OptionMisuse { message: String },

    /// No provider is registered for the requested type.
    #[error("dependency not found: {type_name}")]
    DependencyNotFound { type_name: String },

    /// Resolving the type would re-enter its own construction.
    #[error("circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// A downcast from the type-erased container storage failed; indicates a container bug
    /// rather than user error.
    #[error("failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    /// A provide was used outside the module subtree that registered it as private.
    #[error("scope mismatch: {message}")]
    ScopeMismatch { message: String },

    /// A user constructor or invoke function returned an error, optionally with a DOT
    /// rendering of the dependency graph attached for diagnostics.
    #[error("{message}")]
    Invoke {
        message: String,
        graph: Option<String>,
    },

    /// A user constructor panicked and panic recovery was enabled.
    #[error("constructor panicked at {trace}: {message}")]
    ConstructorPanic { trace: String, message: String },

    /// `onStart` or `onStop` returned an error, or the hook's worker task exited without
    /// producing a value.
    #[error("hook {name} failed: {message}")]
    Hook { name: String, message: String },

    /// A start or stop deadline elapsed before the hook completed.
    #[error("deadline exceeded during {phase}")]
    Deadline { phase: String },

    /// The user-supplied event logger constructor failed; never fatal to the App.
    #[error("logger construction failed: {message}")]
    Logger { message: String },

    /// Several errors occurred in the same phase and were retained together rather than
    /// short-circuiting on the first one.
    #[error("{}", join_messages(.0))]
    Multiple(Vec<Error>),

    /// Catch-all for conditions that don't fit the taxonomy above.
    #[error("{0}")]
    Internal(String),
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn option_misuse(message: impl Into<String>) -> Self {
        Self::OptionMisuse {
            message: message.into(),
        }
    }

    pub fn dependency_not_found(type_name: impl Into<String>) -> Self {
        Self::DependencyNotFound {
            type_name: type_name.into(),
        }
    }

    pub fn circular(cycle: impl Into<String>) -> Self {
        Self::CircularDependency {
            cycle: cycle.into(),
        }
    }

    pub fn downcast_failed(type_name: impl Into<String>) -> Self {
        Self::DowncastFailed {
            type_name: type_name.into(),
        }
    }

    pub fn scope_mismatch(message: impl Into<String>) -> Self {
        Self::ScopeMismatch {
            message: message.into(),
        }
    }

    pub fn invoke(message: impl Into<String>) -> Self {
        Self::Invoke {
            message: message.into(),
            graph: None,
        }
    }

    pub fn constructor_panic(trace: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstructorPanic {
            trace: trace.into(),
            message: message.into(),
        }
    }

    pub fn hook(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn deadline(phase: impl Into<String>) -> Self {
        Self::Deadline {
            phase: phase.into(),
        }
    }

    pub fn logger(message: impl Into<String>) -> Self {
        Self::Logger {
            message: message.into(),
        }
    }

    /// Combine two optional errors into one, flattening nested [`Error::Multiple`] so the
    /// combined tree never grows deeper than one level.
    pub fn combine(first: Option<Error>, second: Option<Error>) -> Option<Error> {
        match (first, second) {
            (None, None) => None,
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (Some(a), Some(b)) => {
                let mut errors = Vec::new();
                flatten_into(a, &mut errors);
                flatten_into(b, &mut errors);
                Some(Error::Multiple(errors))
            }
        }
    }

    /// Fold an iterator of errors, retaining every one rather than short-circuiting.
    pub fn fold(errors: impl IntoIterator<Item = Error>) -> Option<Error> {
        let mut acc = None;
        for err in errors {
            acc = Error::combine(acc, Some(err));
        }
        acc
    }

    /// Attach a DOT-graph rendering to an invoke error, if it doesn't have one already.
    pub fn with_graph(self, graph: impl Into<String>) -> Self {
        match self {
            Error::Invoke { message, graph: None } => Error::Invoke {
                message,
                graph: Some(graph.into()),
            },
            other => other,
        }
    }
}

fn flatten_into(err: Error, out: &mut Vec<Error>) {
    match err {
        Error::Multiple(nested) => out.extend(nested),
        other => out.push(other),
    }
}

/// Capability exposed by errors that can carry a DOT-language dependency-graph rendering.
///
/// Only [`Error::Invoke`] variants populated via [`Error::with_graph`] return `Some`.
pub trait HasGraph {
    fn graph(&self) -> Option<&str>;
}

impl HasGraph for Error {
    fn graph(&self) -> Option<&str> {
        match self {
            Error::Invoke { graph, .. } => graph.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_flattens_multiple() {
        let a = Error::invoke("boom");
        let b = Error::hook("svc", "dead");
        let combined = Error::combine(Some(a), Some(b)).unwrap();
        match combined {
            Error::Multiple(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[test]
    fn combine_none_with_some_returns_some() {
        let err = Error::deadline("start");
        assert!(Error::combine(None, Some(err)).is_some());
        assert!(Error::combine(None, None).is_none());
    }

    #[test]
    fn with_graph_attaches_once() {
        let err = Error::invoke("missing B").with_graph("digraph {}");
        assert_eq!(err.graph(), Some("digraph {}"));
    }
}
