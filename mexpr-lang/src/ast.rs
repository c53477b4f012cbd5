pub mod operators;
use crate::ast::operators::Op;
use crate::descriptor::Primitive;
use crate::interner::{ExprNodeId, Symbol, with_session_globals};
use crate::utils::metadata::{Location, Span};
use crate::utils::miniprint::MiniPrint;
use std::fmt::{self, Write};

#[derive(Clone, Debug, PartialEq, Hash)]
pub enum Literal {
    Int(i64),
    Float(Symbol),
    String(Symbol),
    Bool(bool),
    Null,
    This,
    /// `$`, the wildcard that absorbs an arbitrary sub-expression.
    PlaceHolder,
}

/// The type written in `new`/cast position: a primitive keyword or a
/// (possibly dot-qualified) class name. Resolution to a canonical identity
/// happens later, against the [`ClassTable`](crate::descriptor::ClassTable).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypePath {
    Primitive(Primitive),
    Class(Symbol),
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypePath::Primitive(p) => write!(f, "{}", p.keyword()),
            TypePath::Class(name) => write!(f, "{name}"),
        }
    }
}

/// One `[ ... ]` group of an array-creation expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Dimension {
    Sized(ExprNodeId),
    Wildcard,
}

impl Expr {
    fn into_id_inner(self, loc: Option<Location>) -> ExprNodeId {
        let loc = loc.unwrap_or_default();
        with_session_globals(|session_globals| session_globals.store_expr_with_location(self, loc))
    }

    pub fn into_id(self, loc: Location) -> ExprNodeId {
        self.into_id_inner(Some(loc))
    }

    // For testing purposes
    pub fn into_id_without_span(self) -> ExprNodeId {
        self.into_id_inner(None)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Unqualified name reference. May stand for a local or an implicit-this
    /// field of the target method.
    Var(Symbol),
    FieldAccess(ExprNodeId, Symbol),
    /// `owner.name(args)`; owner `None` for an unqualified call.
    MethodCall(Option<ExprNodeId>, Symbol, Vec<ExprNodeId>),
    NewInstance(TypePath, Vec<ExprNodeId>),
    /// Exactly one of: at least one sized dimension with no initializer, or
    /// all-wildcard dimensions with an initializer. The parser rejects every
    /// other shape.
    NewArray(TypePath, Vec<Dimension>, Option<Vec<ExprNodeId>>),
    ArrayAccess(ExprNodeId, ExprNodeId),
    Assign(ExprNodeId, ExprNodeId),
    BinOp(ExprNodeId, (Op, Span), ExprNodeId),
    UniOp((Op, Span), ExprNodeId),
    Cast(TypePath, ExprNodeId),
    /// Kept distinct from its inner node so printing round-trips exactly.
    Paren(ExprNodeId),

    Error,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(n) => write!(f, "{n}"),
            Literal::String(s) => {
                // escapes were decoded by the lexer, re-escape on the way out
                f.write_char('"')?;
                for c in s.as_str().chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        '\0' => f.write_str("\\0")?,
                        other => f.write_char(other)?,
                    }
                }
                f.write_char('"')
            }
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Null => write!(f, "null"),
            Literal::This => write!(f, "this"),
            Literal::PlaceHolder => write!(f, "$"),
        }
    }
}

impl MiniPrint for Literal {
    fn simple_print(&self) -> String {
        self.to_string()
    }
}

fn concat_vec<T: MiniPrint>(vec: &[T]) -> String {
    vec.iter()
        .map(|t| t.simple_print())
        .collect::<Vec<_>>()
        .join(" ")
}

impl MiniPrint for ExprNodeId {
    fn simple_print(&self) -> String {
        let span = self.to_span();
        format!(
            "{}:{}..{}",
            self.to_expr().simple_print(),
            span.start,
            span.end
        )
    }
}

impl MiniPrint for Dimension {
    fn simple_print(&self) -> String {
        match self {
            Dimension::Sized(e) => format!("[{}]", e.simple_print()),
            Dimension::Wildcard => "[]".to_string(),
        }
    }
}

impl MiniPrint for Expr {
    fn simple_print(&self) -> String {
        match self {
            Expr::Literal(l) => l.simple_print(),
            Expr::Var(v) => format!("{v}"),
            Expr::FieldAccess(owner, field) => {
                format!("(field-access {} {})", owner.simple_print(), field)
            }
            Expr::MethodCall(owner, name, args) => {
                let owner = owner.map_or("_".to_string(), |o| o.simple_print());
                format!("(call {} {} ({}))", owner, name, concat_vec(args))
            }
            Expr::NewInstance(ty, args) => {
                format!("(new {} ({}))", ty, concat_vec(args))
            }
            Expr::NewArray(ty, dims, init) => {
                let init = init
                    .as_ref()
                    .map_or("()".to_string(), |items| concat_vec(items));
                format!("(new-array {} {} {})", ty, concat_vec(dims), init)
            }
            Expr::ArrayAccess(e, i) => {
                format!("(arrayaccess {} {})", e.simple_print(), i.simple_print())
            }
            Expr::Assign(lhs, rhs) => {
                format!("(assign {} {})", lhs.simple_print(), rhs.simple_print())
            }
            Expr::BinOp(lhs, op, rhs) => {
                format!(
                    "(binop {} {} {})",
                    op.0,
                    lhs.simple_print(),
                    rhs.simple_print()
                )
            }
            Expr::UniOp(op, expr) => {
                format!("(unary {} {})", op.0, expr.simple_print())
            }
            Expr::Cast(ty, expr) => format!("(cast {} {})", ty, expr.simple_print()),
            Expr::Paren(inner) => format!("(paren {})", inner.simple_print()),
            Expr::Error => "(error)".to_string(),
        }
    }
}

pub(crate) const PREC_ASSIGN: u8 = 1;
pub(crate) const PREC_UNARY: u8 = 12;
pub(crate) const PREC_POSTFIX: u8 = 13;

fn strip_paren(mut e: ExprNodeId) -> ExprNodeId {
    while let Expr::Paren(inner) = e.to_expr() {
        e = inner;
    }
    e
}

fn equivalent_all(a: &[ExprNodeId], b: &[ExprNodeId]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equivalent(y))
}

impl ExprNodeId {
    /// Structural equality that looks through [`Expr::Paren`] wrappers. This
    /// is the equality the print/parse round-trip holds under: the canonical
    /// printer inserts parentheses wherever precedence demands them, and the
    /// re-parse records those as `Paren` nodes.
    pub fn equivalent(&self, other: &ExprNodeId) -> bool {
        use Expr::*;
        match (strip_paren(*self).to_expr(), strip_paren(*other).to_expr()) {
            (Literal(x), Literal(y)) => x == y,
            (Var(x), Var(y)) => x == y,
            (FieldAccess(ox, nx), FieldAccess(oy, ny)) => nx == ny && ox.equivalent(&oy),
            (MethodCall(ox, nx, ax), MethodCall(oy, ny, ay)) => {
                let owners = match (ox, oy) {
                    (None, None) => true,
                    (Some(x), Some(y)) => x.equivalent(&y),
                    _ => false,
                };
                owners && nx == ny && equivalent_all(&ax, &ay)
            }
            (NewInstance(tx, ax), NewInstance(ty, ay)) => tx == ty && equivalent_all(&ax, &ay),
            (NewArray(tx, dx, ix), NewArray(ty, dy, iy)) => {
                let dims = dx.len() == dy.len()
                    && dx.iter().zip(dy.iter()).all(|(a, b)| match (a, b) {
                        (Dimension::Sized(x), Dimension::Sized(y)) => x.equivalent(y),
                        (Dimension::Wildcard, Dimension::Wildcard) => true,
                        _ => false,
                    });
                let init = match (&ix, &iy) {
                    (None, None) => true,
                    (Some(x), Some(y)) => equivalent_all(x, y),
                    _ => false,
                };
                tx == ty && dims && init
            }
            (ArrayAccess(ax, ix), ArrayAccess(ay, iy)) => {
                ax.equivalent(&ay) && ix.equivalent(&iy)
            }
            (Assign(lx, rx), Assign(ly, ry)) => lx.equivalent(&ly) && rx.equivalent(&ry),
            (BinOp(lx, (opx, _), rx), BinOp(ly, (opy, _), ry)) => {
                opx == opy && lx.equivalent(&ly) && rx.equivalent(&ry)
            }
            (UniOp((opx, _), ex), UniOp((opy, _), ey)) => opx == opy && ex.equivalent(&ey),
            (Cast(tx, ex), Cast(ty, ey)) => tx == ty && ex.equivalent(&ey),
            (Error, Error) => true,
            _ => false,
        }
    }

    /// Canonical re-serialization of the pattern. Not necessarily
    /// byte-identical to the original text, but re-parsing the result yields
    /// an [`equivalent`](Self::equivalent) tree.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out, 0);
        out
    }

    fn prec(&self) -> u8 {
        match self.to_expr() {
            Expr::Assign(..) => PREC_ASSIGN,
            Expr::BinOp(_, (op, _), _) => op.precedence(),
            Expr::UniOp(..) | Expr::Cast(..) => PREC_UNARY,
            _ => PREC_POSTFIX,
        }
    }

    fn write_source(&self, out: &mut String, min_prec: u8) {
        let prec = self.prec();
        if prec < min_prec {
            out.push('(');
            self.write_source(out, 0);
            out.push(')');
            return;
        }
        let write_args = |out: &mut String, args: &[ExprNodeId]| {
            out.push('(');
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                a.write_source(out, 0);
            }
            out.push(')');
        };
        match self.to_expr() {
            Expr::Literal(l) => {
                let _ = write!(out, "{l}");
            }
            Expr::Var(v) => {
                let _ = write!(out, "{v}");
            }
            Expr::FieldAccess(owner, field) => {
                owner.write_source(out, PREC_POSTFIX);
                let _ = write!(out, ".{field}");
            }
            Expr::MethodCall(owner, name, args) => {
                if let Some(owner) = owner {
                    owner.write_source(out, PREC_POSTFIX);
                    out.push('.');
                }
                let _ = write!(out, "{name}");
                write_args(out, &args);
            }
            Expr::NewInstance(ty, args) => {
                let _ = write!(out, "new {ty}");
                write_args(out, &args);
            }
            Expr::NewArray(ty, dims, init) => {
                let _ = write!(out, "new {ty}");
                for d in &dims {
                    match d {
                        Dimension::Sized(e) => {
                            out.push('[');
                            e.write_source(out, 0);
                            out.push(']');
                        }
                        Dimension::Wildcard => out.push_str("[]"),
                    }
                }
                if let Some(items) = init {
                    out.push('{');
                    for (i, e) in items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        e.write_source(out, 0);
                    }
                    out.push('}');
                }
            }
            Expr::ArrayAccess(arr, idx) => {
                arr.write_source(out, PREC_POSTFIX);
                out.push('[');
                idx.write_source(out, 0);
                out.push(']');
            }
            Expr::Assign(lhs, rhs) => {
                lhs.write_source(out, PREC_ASSIGN + 1);
                out.push_str(" = ");
                rhs.write_source(out, PREC_ASSIGN);
            }
            Expr::BinOp(lhs, (op, _), rhs) => {
                lhs.write_source(out, prec);
                let _ = write!(out, " {op} ");
                rhs.write_source(out, prec.saturating_add(1));
            }
            Expr::UniOp((op, _), e) => {
                let _ = write!(out, "{op}");
                e.write_source(out, PREC_UNARY);
            }
            Expr::Cast(ty, e) => {
                let _ = write!(out, "({ty}) ");
                e.write_source(out, PREC_UNARY);
            }
            Expr::Paren(inner) => {
                out.push('(');
                inner.write_source(out, 0);
                out.push(')');
            }
            Expr::Error => out.push_str("<error>"),
        }
    }
}
