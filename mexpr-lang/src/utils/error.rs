use std::ops::Range;

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};

use crate::interner::{Symbol, ToSymbol};

use super::metadata::Location;

/// A dynamic error type that can hold specific error messages and the location where the error happened.
pub trait ReportableError: std::error::Error {
    /// message is used for reporting verbose message for `ariadne``.
    fn get_message(&self) -> String {
        self.to_string()
    }
    /// Label is used for indicating error with the specific position for `ariadne``.
    /// One error may have multiple labels when the cause spans several
    /// positions in the pattern text.
    fn get_labels(&self) -> Vec<(Location, String)>;
}

/// ReportableError implements `PartialEq`` mostly for testing purpose.
impl PartialEq for dyn ReportableError + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.get_labels() == other.get_labels()
    }
}

struct PatternCache {
    src: ariadne::Source<Symbol>,
}

impl ariadne::Cache<usize> for PatternCache {
    type Storage = Symbol;

    fn fetch(&mut self, _id: &usize) -> Result<&Source<Self::Storage>, impl std::fmt::Debug> {
        Ok::<&ariadne::Source<Symbol>, String>(&self.src)
    }

    fn display<'a>(&self, id: &'a usize) -> Option<impl std::fmt::Display + 'a> {
        Some(Box::new(id.to_string()))
    }
}

pub fn report(src: &str, path: Symbol, errs: &[Box<dyn ReportableError + '_>]) {
    let mut colors = ColorGenerator::new();
    for e in errs {
        let rawlabels = e.get_labels();
        let labels = rawlabels.iter().map(|(loc, message)| {
            let span = (path.0, loc.span.clone());
            Label::new(span)
                .with_message(message)
                .with_color(colors.next())
        });
        let span: (usize, Range<usize>) = (path.0, rawlabels[0].0.span.clone());
        let builder = Report::build(ReportKind::Error, span)
            .with_message(e.get_message())
            .with_labels(labels)
            .finish();
        let cache = PatternCache {
            src: ariadne::Source::from(src.to_symbol()),
        };
        builder.eprint(cache).unwrap();
    }
}
