/// Compact s-expression dump of AST nodes, used by tests and `--emit-ast`.
pub trait MiniPrint {
    fn simple_print(&self) -> String;
}
