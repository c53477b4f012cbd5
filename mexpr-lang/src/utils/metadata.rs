use crate::interner::{Symbol, ToSymbol};

pub type Span = std::ops::Range<usize>;

/// A span together with the name of the source it came from. Patterns are
/// usually annotation attribute strings, so `path` is the label of that
/// attribute rather than a file on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub span: Span,
    pub path: Symbol,
}
impl Location {
    pub fn new(span: Span, path: Symbol) -> Self {
        Self { span, path }
    }
}
impl Default for Location {
    fn default() -> Self {
        Self {
            span: 0..0,
            path: "".to_symbol(),
        }
    }
}

#[macro_export]
macro_rules! dummy_span {
    () => {
        0..0
    };
}
