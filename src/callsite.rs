//! Call-site capture.
//!
//! The core never inspects constructor signatures, but it does need to *name* the hooks,
//! provides, and invokes it registers for diagnostics. Rather than hand-roll a stack walker
//! (the reflection-heavy approach the original took), this uses `#[track_caller]` and
//! [`std::panic::Location`] — the idiomatic Rust substitute for call-site reflection.

use std::fmt;
use std::panic::Location;

/// The source location that registered a provide, invoke, or hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    location: &'static Location<'static>,
}

impl CallSite {
    /// Capture the caller's location. Must be called from a `#[track_caller]` function one
    /// frame up from the code the user actually wrote, or the location will point here
    /// instead of at the user's call site.
    #[track_caller]
    pub fn capture() -> Self {
        Self {
            location: Location::caller(),
        }
    }

    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    pub fn line(&self) -> u32 {
        self.location.line()
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.location.file(), self.location.line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn capture_here() -> CallSite {
        CallSite::capture()
    }

    #[test]
    fn capture_records_this_file() {
        let site = capture_here();
        assert!(site.file().ends_with("callsite.rs"));
        assert!(site.line() > 0);
    }
}
