use super::*;
use crate::ast::operators::Op;
use crate::ast::*;
use crate::interner::ToSymbol;
use crate::utils::metadata::Span;

fn parse_ok(src: &str) -> ExprNodeId {
    let (ast, errs) = parse(src, None);
    assert!(
        errs.is_empty(),
        "parse errors for {src:?}: {:?}",
        errs.iter().map(|e| e.get_message()).collect::<Vec<_>>()
    );
    ast
}

fn parse_err(src: &str) -> Vec<String> {
    let (_, errs) = parse(src, None);
    assert!(!errs.is_empty(), "expected {src:?} to fail");
    errs.iter().map(|e| e.get_message()).collect()
}

fn assert_tree(src: &str, expected: ExprNodeId) {
    let got = parse_ok(src);
    assert!(
        got.equivalent(&expected),
        "{src:?} parsed to {} instead of {}",
        got.to_source(),
        expected.to_source()
    );
}

fn id(e: Expr) -> ExprNodeId {
    e.into_id_without_span()
}
fn var(name: &str) -> ExprNodeId {
    id(Expr::Var(name.to_symbol()))
}
fn int(v: i64) -> ExprNodeId {
    id(Expr::Literal(Literal::Int(v)))
}
fn this() -> ExprNodeId {
    id(Expr::Literal(Literal::This))
}
fn hole() -> ExprNodeId {
    id(Expr::Literal(Literal::PlaceHolder))
}
fn binop(op: Op, lhs: ExprNodeId, rhs: ExprNodeId) -> ExprNodeId {
    id(Expr::BinOp(lhs, (op, Span::default()), rhs))
}
fn uniop(op: Op, e: ExprNodeId) -> ExprNodeId {
    id(Expr::UniOp((op, Span::default()), e))
}

#[test]
fn literals() {
    assert_tree("42", int(42));
    assert_tree("0x2a", int(42));
    assert_tree("1.5", id(Expr::Literal(Literal::Float("1.5".to_symbol()))));
    assert_tree(
        r#""hi""#,
        id(Expr::Literal(Literal::String("hi".to_symbol()))),
    );
    // char literals carry their scalar value
    assert_tree("'a'", int(97));
    assert_tree("true", id(Expr::Literal(Literal::Bool(true))));
    assert_tree("null", id(Expr::Literal(Literal::Null)));
    assert_tree("this", this());
    assert_tree("$", hole());
}

#[test]
fn field_chain() {
    assert_tree(
        "this.pos.x",
        id(Expr::FieldAccess(
            id(Expr::FieldAccess(this(), "pos".to_symbol())),
            "x".to_symbol(),
        )),
    );
}

#[test]
fn calls() {
    assert_tree(
        "foo($)",
        id(Expr::MethodCall(None, "foo".to_symbol(), vec![hole()])),
    );
    assert_tree(
        "a.b.c()",
        id(Expr::MethodCall(
            Some(id(Expr::FieldAccess(var("a"), "b".to_symbol()))),
            "c".to_symbol(),
            vec![],
        )),
    );
    assert_tree(
        "this.update(x, 1)",
        id(Expr::MethodCall(
            Some(this()),
            "update".to_symbol(),
            vec![var("x"), int(1)],
        )),
    );
}

#[test]
fn binary_precedence() {
    assert_tree(
        "1 + 2 * 3",
        binop(Op::Sum, int(1), binop(Op::Product, int(2), int(3))),
    );
    assert_tree(
        "1 << 2 + 3",
        binop(Op::Shl, int(1), binop(Op::Sum, int(2), int(3))),
    );
    assert_tree(
        "a & b == c",
        binop(Op::BitAnd, var("a"), binop(Op::Equal, var("b"), var("c"))),
    );
    assert_tree(
        "a || b && c",
        binop(Op::Or, var("a"), binop(Op::And, var("b"), var("c"))),
    );
    // same level associates left
    assert_tree(
        "a - b + c",
        binop(Op::Sum, binop(Op::Minus, var("a"), var("b")), var("c")),
    );
}

#[test]
fn unary_folds() {
    assert_tree(
        "-~!x",
        uniop(Op::Minus, uniop(Op::BitNot, uniop(Op::Not, var("x")))),
    );
    assert_tree(
        "-1 - -2",
        binop(Op::Minus, uniop(Op::Minus, int(1)), uniop(Op::Minus, int(2))),
    );
}

#[test]
fn assignment() {
    assert_tree(
        "a = b = 1",
        id(Expr::Assign(var("a"), id(Expr::Assign(var("b"), int(1))))),
    );
    assert_tree(
        "this.x = $",
        id(Expr::Assign(
            id(Expr::FieldAccess(this(), "x".to_symbol())),
            hole(),
        )),
    );
    assert_tree(
        "xs[0] = 1",
        id(Expr::Assign(id(Expr::ArrayAccess(var("xs"), int(0))), int(1))),
    );
    parse_err("1 = 2");
    // a parenthesized name is not a store target
    parse_err("(a) = 1");
}

#[test]
fn new_instance() {
    assert_tree(
        "new Foo(1, x)",
        id(Expr::NewInstance(
            TypePath::Class("Foo".to_symbol()),
            vec![int(1), var("x")],
        )),
    );
    assert_tree(
        "new a.b.Foo()",
        id(Expr::NewInstance(TypePath::Class("a.b.Foo".to_symbol()), vec![])),
    );
}

#[test]
fn new_array_shapes() {
    let int_ty = TypePath::Primitive(crate::descriptor::Primitive::Int);
    assert_tree(
        "new int[3]",
        id(Expr::NewArray(
            int_ty.clone(),
            vec![Dimension::Sized(int(3))],
            None,
        )),
    );
    assert_tree(
        "new int[]{1, 2, 3}",
        id(Expr::NewArray(
            int_ty.clone(),
            vec![Dimension::Wildcard],
            Some(vec![int(1), int(2), int(3)]),
        )),
    );
    assert_tree(
        "new int[2][]",
        id(Expr::NewArray(
            int_ty,
            vec![Dimension::Sized(int(2)), Dimension::Wildcard],
            None,
        )),
    );
    assert_tree(
        "new Foo[$]",
        id(Expr::NewArray(
            TypePath::Class("Foo".to_symbol()),
            vec![Dimension::Sized(hole())],
            None,
        )),
    );
}

#[test]
fn new_array_rejections() {
    // the shape diagnostics must survive, not just the parse failure
    let msgs = parse_err("new int[3]{1}");
    assert!(
        msgs.iter()
            .any(|m| m.contains("both dimension sizes and an initializer")),
        "{msgs:?}"
    );
    let msgs = parse_err("new int[][2]");
    assert!(
        msgs.iter().any(|m| m.contains("cannot follow an empty one")),
        "{msgs:?}"
    );
    let msgs = parse_err("new int[]");
    assert!(
        msgs.iter()
            .any(|m| m.contains("needs dimension sizes or an initializer")),
        "{msgs:?}"
    );
}

#[test]
fn postfix_on_new() {
    assert_tree(
        "new int[n].length",
        id(Expr::FieldAccess(
            id(Expr::NewArray(
                TypePath::Primitive(crate::descriptor::Primitive::Int),
                vec![Dimension::Sized(var("n"))],
                None,
            )),
            "length".to_symbol(),
        )),
    );
}

#[test]
fn casts_and_parens() {
    let int_ty = TypePath::Primitive(crate::descriptor::Primitive::Int);
    assert_tree("(int) x", id(Expr::Cast(int_ty.clone(), var("x"))));
    assert_tree("(int) -x", id(Expr::Cast(int_ty, uniop(Op::Minus, var("x")))));
    assert_tree(
        "(Foo) x",
        id(Expr::Cast(TypePath::Class("Foo".to_symbol()), var("x"))),
    );
    assert_tree(
        "(Foo)(x)",
        id(Expr::Cast(TypePath::Class("Foo".to_symbol()), var("x"))),
    );
    assert_tree(
        "(int[]) x",
        id(Expr::Cast(TypePath::Class("int[]".to_symbol()), var("x"))),
    );
    // not a cast: the next token cannot begin an expression
    assert_tree("(foo) - x", binop(Op::Minus, var("foo"), var("x")));
    // cast binds tighter than binary operators
    assert_tree(
        "(int) x + y",
        binop(
            Op::Sum,
            id(Expr::Cast(
                TypePath::Primitive(crate::descriptor::Primitive::Int),
                var("x"),
            )),
            var("y"),
        ),
    );
}

#[test]
fn paren_nodes_survive_printing() {
    let ast = parse_ok("(a + b) * c");
    assert_eq!(ast.to_source(), "(a + b) * c");
    assert_tree(
        "(a + b) * c",
        binop(Op::Product, binop(Op::Sum, var("a"), var("b")), var("c")),
    );
}

#[test]
fn roundtrip() {
    let sources = [
        "this.items[i + 1] = new Foo(a, $)",
        "-(a + b) * c",
        "(Foo) this.x",
        "new int[2][]",
        "new int[]{1, 2, 3}",
        "a == b || c < d >> 2",
        "foo(bar(), x.y[0])",
        "~flags & 0xff",
        r#"log("a\"b\n")"#,
    ];
    for src in sources {
        let first = parse_ok(src);
        let printed = first.to_source();
        let second = parse_ok(&printed);
        assert!(
            first.equivalent(&second),
            "round-trip changed {src:?}: printed {printed:?}, reparsed {}",
            second.to_source()
        );
    }
}

#[test]
fn spans_cover_source() {
    let ast = parse_ok("1 + 23");
    assert_eq!(ast.to_span(), 0..6);
    if let Expr::BinOp(lhs, _, rhs) = ast.to_expr() {
        assert_eq!(lhs.to_span(), 0..1);
        assert_eq!(rhs.to_span(), 4..6);
    } else {
        panic!("expected binop, got {}", ast.to_source());
    }
}

#[test]
fn failure_yields_error_node() {
    let (ast, errs) = parse("foo(", None);
    assert!(!errs.is_empty());
    assert_eq!(ast.to_expr(), Expr::Error);
}
