//! Diagnostic sink for name analysis
//!
//! Name-analysis conditions are not fatal: the analyzer reports them here
//! and keeps walking, so every error in a file surfaces in a single run.

use thiserror::Error;

use crate::utils::Pos;

/// The name-analysis error conditions. `Display` yields the exact message
/// text that appears on stderr.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameErr {
    #[error("Undeclared identifier")]
    Undeclared,
    #[error("Multiply declared identifier")]
    MultiplyDeclared,
    #[error("Non-function declared void")]
    NonFnVoid,
    #[error("Invalid name of struct type")]
    InvalidStructType,
    #[error("Invalid struct field name")]
    InvalidFieldName,
    #[error("Dot-access of non-struct type")]
    DotNonStruct,
}

/// A single reported diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diag {
    pub pos: Pos,
    pub err: NameErr,
}

/// Collects diagnostics in walk order and tracks whether any were
/// reported. Each report is mirrored to stderr immediately, so the stream
/// order matches the depth-first, left-to-right tree walk.
#[derive(Debug, Default)]
pub struct DiagSink {
    diags: Vec<Diag>,
    any_error: bool,
}

impl DiagSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, pos: Pos, err: NameErr) {
        eprintln!("{pos} ***ERROR*** {err}");
        self.diags.push(Diag { pos, err });
        self.any_error = true;
    }

    /// True once any diagnostic has been reported
    pub fn any_error(&self) -> bool {
        self.any_error
    }

    /// All diagnostics reported so far, in report order
    pub fn diags(&self) -> &[Diag] {
        &self.diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_starts_false() {
        let sink = DiagSink::new();
        assert!(!sink.any_error());
        assert!(sink.diags().is_empty());
    }

    #[test]
    fn test_report_sets_flag_and_records() {
        let mut sink = DiagSink::new();
        sink.report(Pos::new(3, 7), NameErr::Undeclared);
        sink.report(Pos::new(4, 1), NameErr::MultiplyDeclared);

        assert!(sink.any_error());
        assert_eq!(
            sink.diags(),
            &[
                Diag {
                    pos: Pos::new(3, 7),
                    err: NameErr::Undeclared
                },
                Diag {
                    pos: Pos::new(4, 1),
                    err: NameErr::MultiplyDeclared
                },
            ]
        );
    }

    #[test]
    fn test_exact_message_strings() {
        assert_eq!(NameErr::Undeclared.to_string(), "Undeclared identifier");
        assert_eq!(
            NameErr::MultiplyDeclared.to_string(),
            "Multiply declared identifier"
        );
        assert_eq!(NameErr::NonFnVoid.to_string(), "Non-function declared void");
        assert_eq!(
            NameErr::InvalidStructType.to_string(),
            "Invalid name of struct type"
        );
        assert_eq!(
            NameErr::InvalidFieldName.to_string(),
            "Invalid struct field name"
        );
        assert_eq!(
            NameErr::DotNonStruct.to_string(),
            "Dot-access of non-struct type"
        );
    }
}
