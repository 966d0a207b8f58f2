//! The process-wide abandon hook.
//!
//! Long-running loops (conversion, simplification, simplex pivoting,
//! constraint propagation, product reduction) consult the registered handler
//! at their heads and unwind with [`Error::Abandoned`] when it answers
//! `true`. The scheduling model is single-threaded cooperative, so the hook
//! uses relaxed atomics.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

pub type AbandonHandler = fn() -> bool;

static HANDLER: AtomicUsize = AtomicUsize::new(0);

/// Installs (or clears, with `None`) the handler consulted at loop heads.
pub fn set_abandon_handler(handler: Option<AbandonHandler>) {
    let raw = handler.map_or(0, |f| f as usize);
    HANDLER.store(raw, Ordering::Relaxed);
}

/// Consults the abandon handler on behalf of `method`.
pub fn maybe_abandon(method: &'static str) -> Result<()> {
    let raw = HANDLER.load(Ordering::Relaxed);
    if raw == 0 {
        return Ok(());
    }
    // SAFETY: the only nonzero values ever stored are `fn() -> bool`
    // pointers from `set_abandon_handler`.
    let f: AbandonHandler = unsafe { std::mem::transmute(raw) };
    if f() {
        Err(Error::Abandoned { method })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always() -> bool {
        true
    }

    #[test]
    fn test_handler_round_trip() {
        assert!(maybe_abandon("test").is_ok());
        set_abandon_handler(Some(always));
        assert_eq!(
            maybe_abandon("test"),
            Err(Error::Abandoned { method: "test" })
        );
        set_abandon_handler(None);
        assert!(maybe_abandon("test").is_ok());
    }
}
