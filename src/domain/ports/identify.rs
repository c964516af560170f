//! Diagnostic identification shared by every strategy.

use std::fmt;

/// Contributes a human-readable description to diagnostic output.
pub trait Identify {
    /// Appends this strategy's identifier to `out`.
    ///
    /// # Errors
    /// Propagates formatter errors from `out`.
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Returns the identifier as an owned string.
    fn identifier(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.append_identifier(&mut out);
        out
    }
}
