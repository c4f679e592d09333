//! Diagnostics reported during conversion.

use std::fmt;

use crate::location::Location;

/// An error message tagged with the source location it refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub loc: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn new(loc: Location, message: impl Into<String>) -> Self {
        Self {
            loc,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.message)
    }
}

/// Where conversion errors go. The converter never aborts on the first
/// error; it reports everything it finds and then returns failure.
pub trait DiagSink {
    fn report(&mut self, diag: Diagnostic);
}

impl DiagSink for Vec<Diagnostic> {
    fn report(&mut self, diag: Diagnostic) {
        self.push(diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location() {
        let d = Diagnostic::new(Location::file("a.mlir", 4, 2), "bad attribute");
        assert_eq!(d.to_string(), "a.mlir:4:2: bad attribute");
    }

    #[test]
    fn vec_collects() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.report(Diagnostic::new(Location::Unknown, "x"));
        assert_eq!(sink.len(), 1);
    }
}
