//! Interrupt requests from outside the engine.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag raised when the process is asked to stop.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Create a lowered flag not tied to any signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag raised by SIGINT and SIGTERM.
    ///
    /// The signals no longer kill the process; the console reports the
    /// interrupt and the caller unwinds normally, restoring the terminal.
    #[cfg(feature = "terminal")]
    pub fn register() -> io::Result<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        let flag = Self::new();
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&flag.0))?;
        }
        Ok(flag)
    }

    /// Raise the flag.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether the flag has been raised.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag is raised.
    pub fn check(&self) -> io::Result<()> {
        if self.is_raised() {
            Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted by signal"))
        } else {
            Ok(())
        }
    }
}
