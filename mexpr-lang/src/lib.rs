//! Core library for **mexpr**, a small pattern language over Java-like
//! expressions that locates code inside a compiled method's instruction
//! stream.
//!
//! A pattern string such as `this.items[i] = new Foo($)` is lexed and parsed
//! into an immutable tree, then structurally matched against a
//! caller-supplied [`instruction`] sequence. Type names on both sides go
//! through the [`descriptor`] resolver against an immutable class-table
//! snapshot.

pub mod ast;
pub mod descriptor;
pub mod instruction;
pub mod interner;
pub mod matcher;
pub mod parser;
pub mod utils;

pub use log;

use descriptor::ClassTable;
use instruction::Instruction;
use interner::ExprNodeId;
pub use matcher::{AmbiguityReport, BatchMatch, MatchOutcome, MatchResult, TargetError};
pub use matcher::{find_matches, merge_batches};
use utils::error::ReportableError;

/// A parsed pattern, ready to be matched against instruction streams.
///
/// This is the high level entry point: [`Pattern::parse`] runs lexer and
/// parser, and [`Pattern::find_matches`] runs the matcher. The underlying
/// tree is arena-allocated and `Pattern` is a cheap copyable handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pattern {
    root: ExprNodeId,
}

impl Pattern {
    /// Parses pattern text. `name` labels the source in diagnostics,
    /// typically the annotation the text came from.
    pub fn parse(src: &str, name: Option<&str>) -> Result<Self, Vec<Box<dyn ReportableError>>> {
        let (root, errs) = parser::parse(src, name);
        if errs.is_empty() {
            Ok(Self { root })
        } else {
            Err(errs)
        }
    }

    pub fn root(&self) -> ExprNodeId {
        self.root
    }

    /// Canonical re-serialization of the pattern text.
    pub fn to_source(&self) -> String {
        self.root.to_source()
    }

    /// Finds all occurrences of this pattern in one target method.
    pub fn find_matches(
        &self,
        insns: &[Instruction],
        classes: &ClassTable,
    ) -> Result<MatchOutcome, TargetError> {
        matcher::find_matches(self.root, insns, classes)
    }
}
