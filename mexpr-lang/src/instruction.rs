//! Stack-machine instruction model that patterns are matched against.
//!
//! Callers lower their bytecode into this shape; the matcher only needs each
//! instruction's stack behavior ([`InsnKind::arity`]/[`InsnKind::pushes`])
//! and its operands. Type operands stay as raw descriptor tokens and are
//! resolved lazily through the [`ClassTable`](crate::descriptor::ClassTable).

use std::fmt;

use crate::ast::operators::Op;
use crate::interner::Symbol;

/// One instruction of a target method body.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub kind: InsnKind,
    /// Opaque tag carried through to match results, typically the original
    /// bytecode offset.
    pub marker: usize,
}

impl Instruction {
    pub fn new(kind: InsnKind, marker: usize) -> Self {
        Self { kind, marker }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InsnKind {
    ConstInt(i64),
    ConstFloat(f64),
    ConstStr(Symbol),
    ConstBool(bool),
    ConstNull,
    LoadThis,

    LocalLoad(Symbol),
    LocalStore(Symbol),

    /// `owner` is a descriptor token; `receiver` is false for static fields.
    FieldLoad {
        owner: Symbol,
        name: Symbol,
        receiver: bool,
    },
    FieldStore {
        owner: Symbol,
        name: Symbol,
        receiver: bool,
    },
    /// `returns` is false for void calls, which therefore never terminate an
    /// expression subtree.
    Call {
        owner: Symbol,
        name: Symbol,
        argc: usize,
        receiver: bool,
        returns: bool,
    },

    NewInstance {
        class: Symbol,
        argc: usize,
    },
    /// Allocation with `dims` sizes already on the stack.
    NewArray {
        elem: Symbol,
        dims: usize,
    },
    /// Fused allocate-and-fill: `len` element values on the stack become the
    /// array contents.
    ArrayFill {
        elem: Symbol,
        len: usize,
    },
    ArrayLoad,
    ArrayStore,

    UnaryOp(Op),
    BinOp(Op),
    Cast(Symbol),
}

impl InsnKind {
    /// How many operands this instruction pops.
    pub fn arity(&self) -> usize {
        match self {
            InsnKind::ConstInt(_)
            | InsnKind::ConstFloat(_)
            | InsnKind::ConstStr(_)
            | InsnKind::ConstBool(_)
            | InsnKind::ConstNull
            | InsnKind::LoadThis
            | InsnKind::LocalLoad(_) => 0,
            InsnKind::LocalStore(_) => 1,
            InsnKind::FieldLoad { receiver, .. } => *receiver as usize,
            InsnKind::FieldStore { receiver, .. } => 1 + *receiver as usize,
            InsnKind::Call { argc, receiver, .. } => argc + *receiver as usize,
            InsnKind::NewInstance { argc, .. } => *argc,
            InsnKind::NewArray { dims, .. } => *dims,
            InsnKind::ArrayFill { len, .. } => *len,
            InsnKind::ArrayLoad => 2,
            InsnKind::ArrayStore => 3,
            InsnKind::UnaryOp(_) | InsnKind::Cast(_) => 1,
            InsnKind::BinOp(_) => 2,
        }
    }

    /// Whether this instruction leaves a value on the stack.
    pub fn pushes(&self) -> bool {
        match self {
            InsnKind::LocalStore(_) | InsnKind::FieldStore { .. } | InsnKind::ArrayStore => false,
            InsnKind::Call { returns, .. } => *returns,
            _ => true,
        }
    }
}

impl fmt::Display for InsnKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InsnKind::ConstInt(v) => write!(f, "const.i {v}"),
            InsnKind::ConstFloat(v) => write!(f, "const.f {v}"),
            InsnKind::ConstStr(s) => write!(f, "const.s \"{s}\""),
            InsnKind::ConstBool(b) => write!(f, "const.b {b}"),
            InsnKind::ConstNull => write!(f, "const.null"),
            InsnKind::LoadThis => write!(f, "this"),
            InsnKind::LocalLoad(name) => write!(f, "load {name}"),
            InsnKind::LocalStore(name) => write!(f, "store {name}"),
            InsnKind::FieldLoad {
                owner,
                name,
                receiver,
            } => write!(
                f,
                "getfield{} {owner}.{name}",
                if *receiver { "" } else { " static" }
            ),
            InsnKind::FieldStore {
                owner,
                name,
                receiver,
            } => write!(
                f,
                "putfield{} {owner}.{name}",
                if *receiver { "" } else { " static" }
            ),
            InsnKind::Call {
                owner,
                name,
                argc,
                receiver,
                returns,
            } => write!(
                f,
                "call{} {owner}.{name}/{argc}{}",
                if *receiver { "" } else { " static" },
                if *returns { "" } else { " void" }
            ),
            InsnKind::NewInstance { class, argc } => write!(f, "new {class}/{argc}"),
            InsnKind::NewArray { elem, dims } => write!(f, "newarray {elem}/{dims}"),
            InsnKind::ArrayFill { elem, len } => write!(f, "arrayfill {elem}/{len}"),
            InsnKind::ArrayLoad => write!(f, "aload"),
            InsnKind::ArrayStore => write!(f, "astore"),
            InsnKind::UnaryOp(op) => write!(f, "unary {op}"),
            InsnKind::BinOp(op) => write!(f, "binop {op}"),
            InsnKind::Cast(ty) => write!(f, "cast {ty}"),
        }
    }
}
