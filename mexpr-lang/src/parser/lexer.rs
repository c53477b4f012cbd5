use super::ToSymbol;
use super::token::*;
use crate::ast::operators::Op;
use crate::descriptor::Primitive;
use chumsky::Parser;
use chumsky::input::StrInput;
use chumsky::prelude::*;

type LexerError<'src> = chumsky::extra::Err<Rich<'src, char, SimpleSpan>>;

fn comment_parser<'src, I>() -> impl Parser<'src, I, Comment, LexerError<'src>> + Clone
where
    I: StrInput<'src, Token = char, Span = SimpleSpan, Slice = &'src str>,
{
    let endline = text::newline().or(end());
    let single_line = just("//")
        .ignore_then(any().and_is(endline.not()).repeated().to_slice())
        .then_ignore(endline)
        .map(|c| Comment::SingleLine(String::from(c)));

    let multi_line = just("/*")
        .ignore_then(any().and_is(just("*/").not()).repeated().to_slice())
        .then_ignore(just("*/"))
        .map(|c| Comment::MultiLine(String::from(c)));

    single_line.or(multi_line)
}

pub fn tokenizer<'src, I>() -> impl Parser<'src, I, Token, LexerError<'src>> + Clone
where
    I: StrInput<'src, Token = char, Span = SimpleSpan, Slice = &'src str>,
{
    // Number parsers. Floats require digits on both sides of the dot, so
    // `1.` never lexes as a float half.
    let float = (text::int::<I, _>(10).to_slice())
        .then_ignore(just('.'))
        .then(text::digits::<I, _>(10).to_slice())
        .map(|(s, n)| Token::Float(format!("{s}.{n}")));

    let hex = just("0x")
        .or(just("0X"))
        .ignore_then(text::digits::<I, _>(16).to_slice())
        .try_map(|s: &'src str, span| {
            i64::from_str_radix(s, 16)
                .map(Token::Int)
                .map_err(|e| Rich::custom(span, format!("invalid hex literal: {e}")))
        });

    let int = text::int::<I, LexerError<'src>>(10).try_map(|s: &'src str, span| {
        s.parse()
            .map(Token::Int)
            .map_err(|e| Rich::custom(span, format!("invalid int literal: {e}")))
    });

    // Escapes are decoded in both string and char literals; patterns compare
    // the decoded value against constant-pool entries.
    let escape = just('\\').ignore_then(one_of("nrt0\\'\"").map(|c| match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        other => other,
    }));

    let str_ = escape
        .clone()
        .or(none_of("\\\""))
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .map(Token::Str);

    let char_ = escape
        .or(none_of("\\'"))
        .delimited_by(just('\''), just('\''))
        .map(Token::Char);

    // Operators lex by longest match against the known table, so `>>>` stays
    // one token while adjacent prefixes such as `-~!x` split into three.
    // `//` and `/*` are excluded by trying the comment parser first.
    let op = choice((
        just(">>>"),
        just("<<"),
        just(">>"),
        just("=="),
        just("!="),
        just("<="),
        just(">="),
        just("&&"),
        just("||"),
        just("+"),
        just("-"),
        just("*"),
        just("/"),
        just("%"),
        just("<"),
        just(">"),
        just("&"),
        just("|"),
        just("^"),
        just("!"),
        just("~"),
        just("="),
    ))
    .map(|s: &str| match s {
        "=" => Token::Assign,
        other => Token::Op(Op::from(other)),
    });

    let separator = one_of(",.$").map(|c| match c {
        ',' => Token::Comma,
        '.' => Token::Dot,
        '$' => Token::PlaceHolder,
        _ => Token::Ident(c.to_string().to_symbol()),
    });

    // A parser for identifiers and keywords
    let ident = text::ident()
        .to_slice()
        .map(|ident: &'src str| match Primitive::from_keyword(ident) {
            Some(p) => Token::PrimitiveType(p),
            None => match ident {
                "new" => Token::New,
                "this" => Token::This,
                "null" => Token::Null,
                "true" => Token::Bool(true),
                "false" => Token::Bool(false),
                _ => Token::Ident(ident.to_symbol()),
            },
        });

    let parens = one_of("(){}[]").map(|c| match c {
        '(' => Token::ParenBegin,
        ')' => Token::ParenEnd,
        '{' => Token::BlockBegin,
        '}' => Token::BlockEnd,
        '[' => Token::ArrayBegin,
        ']' => Token::ArrayEnd,
        _ => Token::Ident(c.to_string().to_symbol()),
    });

    choice((
        comment_parser().map(Token::Comment),
        float,
        hex,
        int,
        char_,
        str_,
        separator,
        ident,
        op,
        parens,
    ))
}

pub fn lexer<'src, I>() -> impl Parser<'src, I, Vec<(Token, SimpleSpan)>, LexerError<'src>> + Clone
where
    I: StrInput<'src, Token = char, Span = SimpleSpan, Slice = &'src str>,
{
    let whitespaces = one_of(" \t\r\n").repeated().ignored();

    tokenizer()
        .map_with(|t, e| (t, e.span()))
        .padded_by(whitespaces)
        .repeated()
        .collect::<Vec<_>>()
}
