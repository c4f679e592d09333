//! Source locations.

use std::fmt;

/// A source location attached to an operation.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Default)]
pub enum Location {
    #[default]
    Unknown,
    FileLineCol {
        filename: String,
        line: u32,
        col: u32,
    },
    /// A human-readable name, optionally wrapping another location.
    Name {
        name: String,
        child: Option<Box<Location>>,
    },
    CallSite {
        callee: Box<Location>,
        caller: Box<Location>,
    },
    Fused(Vec<Location>),
}

impl Location {
    /// File/line/column location.
    pub fn file(filename: impl Into<String>, line: u32, col: u32) -> Self {
        Self::FileLineCol {
            filename: filename.into(),
            line,
            col,
        }
    }

    /// Named location with no underlying position.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name {
            name: name.into(),
            child: None,
        }
    }

    /// Resolves to `(filename, line, col)`, descending one level into fused
    /// locations and taking the first file position found there. Locations
    /// with no file position resolve to `("", 0, 0)`.
    pub fn file_line_col(&self) -> (&str, u32, u32) {
        let mut loc = self;
        if let Self::Fused(children) = loc {
            if let Some(found) = children
                .iter()
                .find(|c| matches!(c, Self::FileLineCol { .. }))
            {
                loc = found;
            }
        }
        match loc {
            Self::FileLineCol {
                filename,
                line,
                col,
            } => (filename, *line, *col),
            _ => ("", 0, 0),
        }
    }

    /// Extracts the debug name, if any: the first named child of a fused
    /// location, the callee of a call site when it is named, or the name
    /// itself.
    pub fn debug_name(&self) -> Option<&str> {
        let mut loc = self;
        if let Self::Fused(children) = loc {
            if let Some(found) = children.iter().find(|c| matches!(c, Self::Name { .. })) {
                loc = found;
            }
        }
        if let Self::CallSite { callee, .. } = loc {
            if matches!(**callee, Self::Name { .. }) {
                loc = callee;
            }
        }
        match loc {
            Self::Name { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "<unknown>"),
            Self::FileLineCol {
                filename,
                line,
                col,
            } => write!(f, "{filename}:{line}:{col}"),
            Self::Name { name, child } => match child {
                Some(child) => write!(f, "\"{name}\"({child})"),
                None => write!(f, "\"{name}\""),
            },
            Self::CallSite { callee, caller } => write!(f, "{callee} at {caller}"),
            Self::Fused(children) => {
                write!(f, "fused[")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, "]")
            }
        }
    }
}
