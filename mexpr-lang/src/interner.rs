//! Storage for interning symbols and expression nodes.
//!
//! The global [`SessionGlobals`] instance keeps track of all identifiers and
//! AST nodes created while parsing patterns. Nodes are immutable once stored;
//! the arena only grows during a session.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt::{self, Display},
};

use slotmap::SlotMap;
use string_interner::{StringInterner, backend::StringBackend};

use crate::{
    ast::Expr,
    dummy_span,
    utils::metadata::{Location, Span},
};
slotmap::new_key_type! {
    pub struct ExprKey;
}

/// Global storages shared by the lexer, parser and matcher of one session.
pub struct SessionGlobals {
    pub symbol_interner: StringInterner<StringBackend<usize>>,
    pub expr_storage: SlotMap<ExprKey, Expr>,
    pub loc_storage: BTreeMap<ExprKey, Location>,
}

impl SessionGlobals {
    fn store_expr(&mut self, expr: Expr) -> ExprNodeId {
        let key = self.expr_storage.insert(expr);
        ExprNodeId(key)
    }

    pub fn store_expr_with_location(&mut self, expr: Expr, loc: Location) -> ExprNodeId {
        let expr_id = self.store_expr(expr);
        self.loc_storage.insert(expr_id.0, loc);
        expr_id
    }

    // Cloning here keeps the borrow of the thread-local short. Nodes are
    // small: children are `ExprNodeId`s, not whole subtrees.
    pub fn get_expr(&self, expr_id: ExprNodeId) -> Expr {
        unsafe { self.expr_storage.get_unchecked(expr_id.0) }.clone()
    }

    pub fn get_loc(&self, expr_id: ExprNodeId) -> Option<&Location> {
        self.loc_storage.get(&expr_id.0)
    }
}

thread_local!(static SESSION_GLOBALS: RefCell<SessionGlobals> =  RefCell::new(
    SessionGlobals {
        symbol_interner: StringInterner::new(),
        expr_storage: SlotMap::with_key(),
        loc_storage: BTreeMap::new()
    }
));

pub fn with_session_globals<R, F>(f: F) -> R
where
    F: FnOnce(&mut SessionGlobals) -> R,
{
    SESSION_GLOBALS.with_borrow_mut(f)
}

#[derive(Default, Copy, Clone, PartialEq, Hash, Eq, PartialOrd, Ord)]
pub struct Symbol(pub usize);

pub trait ToSymbol {
    fn to_symbol(&self) -> Symbol;
}

impl<T: AsRef<str>> ToSymbol for T {
    fn to_symbol(&self) -> Symbol {
        Symbol(with_session_globals(|session_globals| {
            session_globals.symbol_interner.get_or_intern(self.as_ref())
        }))
    }
}

impl Symbol {
    pub fn as_str(&self) -> &str {
        with_session_globals(|session_globals| unsafe {
            // This transmute is needed to convince the borrow checker. Since
            // the session_global should exist until the end of the session,
            // this &str should live sufficiently long.
            std::mem::transmute::<&str, &str>(
                session_globals
                    .symbol_interner
                    .resolve(self.0)
                    .expect("invalid symbol"),
            )
        })
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// Note: to_string() is auto-implemented by this
impl Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.0)
    }
}

#[derive(Clone, Copy, Default)]
pub struct ExprNodeId(pub ExprKey);

/// Equality of node ids is structural: two ids are equal when the stored
/// expressions are equal, regardless of where in the source they came from.
/// Use [`ExprNodeId::equivalent`] when parenthesis wrappers should also be
/// ignored.
impl PartialEq for ExprNodeId {
    fn eq(&self, other: &Self) -> bool {
        self.to_expr() == other.to_expr()
    }
}

impl ExprNodeId {
    pub fn to_expr(&self) -> Expr {
        with_session_globals(|session_globals| session_globals.get_expr(*self))
    }

    pub fn to_span(&self) -> Span {
        with_session_globals(|session_globals| match session_globals.get_loc(*self) {
            Some(loc) => loc.span.clone(),
            None => dummy_span!(),
        })
    }
    pub fn to_location(&self) -> Location {
        with_session_globals(|session_globals| match session_globals.get_loc(*self) {
            Some(loc) => loc.clone(),
            None => Location {
                span: dummy_span!(),
                path: "".to_symbol(),
            },
        })
    }
}

impl std::fmt::Display for ExprNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self.to_span();
        write!(f, "{:?},{}..{}", self.to_expr(), span.start, span.end)
    }
}
impl std::fmt::Debug for ExprNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self.to_span();
        write!(f, "{:#?},{}..{}", self.to_expr(), span.start, span.end)
    }
}
