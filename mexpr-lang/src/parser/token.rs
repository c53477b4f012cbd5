use std::fmt;

use crate::ast::operators::Op;
use crate::descriptor::Primitive;
use crate::interner::Symbol;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Comment {
    SingleLine(String),
    MultiLine(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    Ident(Symbol),

    Int(i64),
    Float(String),
    Str(String),
    Char(char),
    Bool(bool),
    Null,

    This,
    New,
    /// Primitive type keyword such as `int` or `boolean`.
    PrimitiveType(Primitive),

    Op(Op),
    Assign,
    /// `$`, the wildcard expression.
    PlaceHolder,

    Comma,
    /// Dot operator, used for field access and call receivers, concatenated
    /// with left associativity.
    Dot,

    ParenBegin,
    ParenEnd,
    ArrayBegin,
    ArrayEnd,
    BlockBegin,
    BlockEnd,

    Comment(Comment),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Ident(x) => write!(f, "{x}"),
            Token::Int(x) => write!(f, "{x}"),
            Token::Float(x) => write!(f, "{x}"),
            Token::Str(x) => write!(f, "\"{x}\""),
            Token::Char(x) => write!(f, "'{x}'"),
            Token::Bool(x) => write!(f, "{x}"),
            Token::Null => write!(f, "null"),
            Token::This => write!(f, "this"),
            Token::New => write!(f, "new"),
            Token::PrimitiveType(p) => write!(f, "{}", p.keyword()),
            Token::Op(x) => write!(f, "{x}"),
            Token::Assign => write!(f, "="),
            Token::PlaceHolder => write!(f, "$"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::ParenBegin => write!(f, "("),
            Token::ParenEnd => write!(f, ")"),
            Token::ArrayBegin => write!(f, "["),
            Token::ArrayEnd => write!(f, "]"),
            Token::BlockBegin => write!(f, "{{"),
            Token::BlockEnd => write!(f, "}}"),
            Token::Comment(_) => write!(f, "comment"),
        }
    }
}
