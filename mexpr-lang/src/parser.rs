use crate::ast::operators::{BINARY_LEVELS, Op};
use crate::ast::*;
use crate::interner::{ExprNodeId, Symbol, ToSymbol};
use crate::utils::error::ReportableError;
use crate::utils::metadata::*;
use chumsky::input::ValueInput;
use chumsky::{Parser, prelude::*};
use itertools::Itertools;

pub mod token;
use token::Token;
mod error;
mod lexer;

#[cfg(test)]
mod test;

#[derive(Clone, Copy)]
pub(crate) struct ParseContext {
    file_path: Symbol,
}
impl ParseContext {
    pub fn gen_loc(&self, span: Span) -> Location {
        Location {
            span,
            path: self.file_path,
        }
    }
}
pub(crate) type ParserError<'src> = chumsky::extra::Err<Rich<'src, Token>>;

fn get_span<T: chumsky::span::Span<Offset = usize>>(e: T) -> Span {
    e.start()..e.end()
}

/// `rank` counts `[]` suffixes on a written type. Array types keep their
/// suffix in the class-name position and are decoded later by the descriptor
/// resolver.
fn array_type_path(base: TypePath, rank: usize) -> TypePath {
    if rank == 0 {
        return base;
    }
    let mut name = match &base {
        TypePath::Primitive(p) => p.keyword().to_string(),
        TypePath::Class(s) => s.as_str().to_string(),
    };
    for _ in 0..rank {
        name.push_str("[]");
    }
    TypePath::Class(name.to_symbol())
}

/// Tokens that may begin an expression. Used to decide whether a
/// parenthesized name is a cast: `(Foo) x` casts, `(foo) - x` subtracts.
fn is_atom_start(t: &Token) -> bool {
    matches!(
        t,
        Token::Ident(_)
            | Token::Int(_)
            | Token::Float(_)
            | Token::Str(_)
            | Token::Char(_)
            | Token::Bool(_)
            | Token::Null
            | Token::This
            | Token::New
            | Token::PlaceHolder
            | Token::PrimitiveType(_)
            | Token::ParenBegin
    )
}

fn expr_parser<'src, I>(
    ctx: ParseContext,
) -> impl Parser<'src, I, ExprNodeId, ParserError<'src>> + Clone
where
    I: ValueInput<'src, Token = Token, Span = SimpleSpan>,
{
    recursive(move |expr| {
        // Unary is declared up front so cast operands can reference it: a
        // cast binds tighter than any binary operator but accepts a nested
        // unary or cast on its right.
        let mut unary = Recursive::declare();

        let ident = select! { Token::Ident(s) => s };

        let literal = select! {
            Token::Int(i) => Expr::Literal(Literal::Int(i)),
            Token::Float(x) => Expr::Literal(Literal::Float(x.to_symbol())),
            Token::Str(s) => Expr::Literal(Literal::String(s.to_symbol())),
            Token::Char(c) => Expr::Literal(Literal::Int(c as i64)),
            Token::Bool(b) => Expr::Literal(Literal::Bool(b)),
            Token::Null => Expr::Literal(Literal::Null),
            Token::This => Expr::Literal(Literal::This),
            Token::PlaceHolder => Expr::Literal(Literal::PlaceHolder),
        }
        .map_with(move |lit, e| lit.into_id(ctx.gen_loc(get_span(e.span()))))
        .labelled("literal");

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::ParenBegin), just(Token::ParenEnd));

        // Dotted class names collapse to one symbol; resolution against the
        // class table happens at match time, not here.
        let class_type = ident
            .separated_by(just(Token::Dot))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|segs| TypePath::Class(segs.iter().map(|s| s.as_str()).join(".").to_symbol()));
        let primitive_type =
            select! { Token::PrimitiveType(p) => TypePath::Primitive(p) }.labelled("type");
        let base_type = primitive_type.clone().or(class_type.clone());

        let dim = expr
            .clone()
            .or_not()
            .delimited_by(just(Token::ArrayBegin), just(Token::ArrayEnd));
        let initializer = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BlockBegin), just(Token::BlockEnd));
        // The token after the type commits to one form: `(` is a constructor
        // call, `[` an array creation. Validating array shapes after that
        // commitment keeps the shape diagnostics from losing an error race
        // against the constructor branch.
        enum NewTail {
            Ctor(Vec<ExprNodeId>),
            Array(Vec<Option<ExprNodeId>>, Option<Vec<ExprNodeId>>),
        }
        let new_tail = choice((
            args.clone().map(NewTail::Ctor),
            dim.repeated()
                .at_least(1)
                .collect::<Vec<_>>()
                .then(initializer.or_not())
                .map(|(dims, init)| NewTail::Array(dims, init)),
        ));
        let new_expr = just(Token::New)
            .ignore_then(base_type.then(new_tail))
            .try_map_with(move |(ty, tail), extra| {
                let span = extra.span();
                let (dims, init) = match tail {
                    NewTail::Ctor(a) => return Ok(Expr::NewInstance(ty, a)),
                    NewTail::Array(dims, init) => (dims, init),
                };
                let mut seen_bare = false;
                for d in &dims {
                    match d {
                        Some(_) if seen_bare => {
                            return Err(Rich::custom(
                                span,
                                "sized array dimension cannot follow an empty one",
                            ));
                        }
                        Some(_) => {}
                        None => seen_bare = true,
                    }
                }
                let any_sized = dims.iter().any(Option::is_some);
                match (&init, any_sized) {
                    (Some(_), true) => {
                        return Err(Rich::custom(
                            span,
                            "array creation cannot have both dimension sizes and an initializer",
                        ));
                    }
                    (None, false) => {
                        return Err(Rich::custom(
                            span,
                            "array creation needs dimension sizes or an initializer",
                        ));
                    }
                    _ => {}
                }
                let dims = dims
                    .into_iter()
                    .map(|d| d.map_or(Dimension::Wildcard, Dimension::Sized))
                    .collect();
                Ok(Expr::NewArray(ty, dims, init))
            })
            .map_with(move |ex, e| ex.into_id(ctx.gen_loc(get_span(e.span()))))
            .labelled("new");

        let array_suffix = just(Token::ArrayBegin)
            .ignore_then(just(Token::ArrayEnd))
            .repeated()
            .count();
        // A primitive type in parens can only be a cast. A bare name needs
        // one token of lookahead: `(Foo) x` is a cast, `(foo) - x` is not.
        let primitive_cast = primitive_type
            .then(array_suffix.clone())
            .map(|(base, rank)| array_type_path(base, rank))
            .delimited_by(just(Token::ParenBegin), just(Token::ParenEnd))
            .then(unary.clone())
            .map(|(ty, operand)| Expr::Cast(ty, operand));
        let class_cast = class_type
            .then(array_suffix)
            .map(|(base, rank)| array_type_path(base, rank))
            .delimited_by(just(Token::ParenBegin), just(Token::ParenEnd))
            .then_ignore(any().filter(is_atom_start).ignored().rewind())
            .then(unary.clone())
            .map(|(ty, operand)| Expr::Cast(ty, operand));
        let cast = primitive_cast
            .or(class_cast)
            .map_with(move |ex, e| ex.into_id(ctx.gen_loc(get_span(e.span()))))
            .labelled("cast");

        // Unqualified call or plain variable.
        let call_or_var = ident
            .then(args.clone().or_not())
            .map_with(move |(name, a), e| {
                let loc = ctx.gen_loc(get_span(e.span()));
                match a {
                    Some(a) => Expr::MethodCall(None, name, a).into_id(loc),
                    None => Expr::Var(name).into_id(loc),
                }
            });

        let paren = expr
            .clone()
            .delimited_by(just(Token::ParenBegin), just(Token::ParenEnd))
            .map_with(move |inner, e| Expr::Paren(inner).into_id(ctx.gen_loc(get_span(e.span()))));

        let atom = choice((literal, new_expr, cast, call_or_var, paren)).boxed();

        enum FoldItem {
            Field(Symbol),
            Method(Symbol, Vec<ExprNodeId>),
            Index(ExprNodeId),
        }
        let dot_postfix = just(Token::Dot)
            .ignore_then(ident.then(args.clone().or_not()))
            .map(|(name, a)| match a {
                Some(a) => FoldItem::Method(name, a),
                None => FoldItem::Field(name),
            });
        let index = expr
            .clone()
            .delimited_by(just(Token::ArrayBegin), just(Token::ArrayEnd))
            .map(FoldItem::Index);
        let postfix = atom
            .foldl(
                dot_postfix
                    .or(index)
                    .map_with(|item, e| (item, get_span(e.span())))
                    .repeated(),
                move |lhs, (item, ispan)| {
                    let loc = ctx.gen_loc(lhs.to_span().start..ispan.end);
                    match item {
                        FoldItem::Field(name) => Expr::FieldAccess(lhs, name).into_id(loc),
                        FoldItem::Method(name, a) => {
                            Expr::MethodCall(Some(lhs), name, a).into_id(loc)
                        }
                        FoldItem::Index(ix) => Expr::ArrayAccess(lhs, ix).into_id(loc),
                    }
                },
            )
            .labelled("postfix");

        let unary_op = select! {
            Token::Op(Op::Minus) => Op::Minus,
            Token::Op(Op::Not) => Op::Not,
            Token::Op(Op::BitNot) => Op::BitNot,
        };
        unary.define(
            unary_op
                .map_with(|op, e| (op, get_span(e.span())))
                .repeated()
                .foldr(postfix, move |(op, opspan), rhs| {
                    let loc = ctx.gen_loc(opspan.start..rhs.to_span().end);
                    Expr::UniOp((op, opspan), rhs).into_id(loc)
                })
                .labelled("unary"),
        );

        // Binary levels fold loosest-to-tightest from the shared table, so
        // printer and parser can never disagree on precedence.
        let binop = BINARY_LEVELS
            .iter()
            .rev()
            .fold(unary.clone().boxed(), |prec, level| {
                let op = select! { Token::Op(o) => o }.filter(move |o| level.contains(o));
                prec.clone()
                    .foldl(
                        op.map_with(|op, e| (op, get_span(e.span()))).then(prec).repeated(),
                        move |x, ((op, opspan), y)| {
                            let loc = ctx.gen_loc(x.to_span().start..y.to_span().end);
                            Expr::BinOp(x, (op, opspan), y).into_id(loc)
                        },
                    )
                    .boxed()
            });

        // Assignment is right associative and the loosest level. The target
        // must be a storable place; `$` stands for any store target.
        binop
            .then(just(Token::Assign).ignore_then(expr.clone()).or_not())
            .try_map(move |(lhs, rhs), span| match rhs {
                Some(rhs) => match lhs.to_expr() {
                    Expr::Var(_)
                    | Expr::FieldAccess(..)
                    | Expr::ArrayAccess(..)
                    | Expr::Literal(Literal::PlaceHolder) => {
                        Ok(Expr::Assign(lhs, rhs).into_id(ctx.gen_loc(get_span(span))))
                    }
                    _ => Err(Rich::custom(span, "invalid assignment target")),
                },
                None => Ok(lhs),
            })
    })
}

pub fn lex(
    src: &str,
    path: Symbol,
) -> (Option<Vec<(Token, SimpleSpan)>>, Vec<Box<dyn ReportableError>>) {
    let (tokens, lex_errs) = lexer::lexer().parse(src).into_output_errors();
    let lex_errs = lex_errs
        .into_iter()
        .map(|e| -> Box<dyn ReportableError> { Box::new(error::ParseError::new(e, path)) })
        .collect();
    (tokens, lex_errs)
}

pub(crate) fn convert_parse_errors<'a>(
    errs: &'a [Rich<'_, Token>],
    file: Symbol,
) -> impl Iterator<Item = Box<dyn ReportableError>> + 'a {
    errs.iter().map(move |e| -> Box<dyn ReportableError> {
        Box::new(error::ParseError::new(e.clone(), file))
    })
}

/// Parse one pattern expression. Always returns a node; on failure the node
/// is [`Expr::Error`] and the error list is non-empty.
pub fn parse(src: &str, pattern_name: Option<&str>) -> (ExprNodeId, Vec<Box<dyn ReportableError>>) {
    let path = pattern_name.unwrap_or_default().to_symbol();
    let (tokens, lex_errs) = lex(src, path);
    let Some(tokens) = tokens else {
        return (Expr::Error.into_id_without_span(), lex_errs);
    };
    let tokens = tokens
        .into_iter()
        .filter(|(t, _)| !matches!(t, Token::Comment(_)))
        .collect::<Vec<_>>();
    log::trace!("tokens: {tokens:?}");
    let tok = tokens
        .as_slice()
        .map((src.len()..src.len()).into(), |(t, s)| (t, s));
    let ctx = ParseContext { file_path: path };
    let (ast, errs) = expr_parser(ctx)
        .then_ignore(end())
        .parse(tok)
        .into_output_errors();
    let errs = convert_parse_errors(&errs, path)
        .chain(lex_errs)
        .collect::<Vec<_>>();
    (
        ast.unwrap_or_else(|| Expr::Error.into_id_without_span()),
        errs,
    )
}
