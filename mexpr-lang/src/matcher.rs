//! Structural matching of pattern trees against instruction streams.
//!
//! The matcher first reconstructs, for every instruction, which earlier
//! instructions produced its operands (a single abstract-stack pass over the
//! stream). Each pattern node then has one deterministic rule against the
//! instruction its position maps to, so matching one candidate site never
//! backtracks. All non-overlapping occurrences are collected in instruction
//! order; occurrences that bind structurally different symbols flag the
//! whole result set as ambiguous instead of silently picking one.

use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::ops::Range;

use itertools::Itertools;

use crate::ast::operators::Op;
use crate::ast::{Dimension, Expr, Literal, TypePath};
use crate::descriptor::{ClassTable, TypeDesc};
use crate::instruction::{InsnKind, Instruction};
use crate::interner::{ExprKey, ExprNodeId, Symbol, ToSymbol};

#[cfg(test)]
mod test;

/// Malformed target input, as opposed to a target that simply does not
/// contain the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// An instruction pops more values than the stream has produced.
    StackUnderflow { at: usize },
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TargetError::StackUnderflow { at } => {
                write!(f, "instruction {at} pops more operands than are on the stack")
            }
        }
    }
}
impl std::error::Error for TargetError {}

/// One occurrence of the pattern inside the target stream.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub root: ExprNodeId,
    /// Matched instruction indices, end exclusive.
    pub range: Range<usize>,
    /// Markers of the first and last matched instruction.
    pub marker_range: (usize, usize),
    pub ambiguous: bool,
    node_ranges: BTreeMap<ExprKey, Range<usize>>,
    fingerprint: String,
}

impl MatchResult {
    /// Instruction sub-range a pattern node was bound to. Nodes that never
    /// consume instructions (static owner names) have no range.
    pub fn range_of(&self, node: ExprNodeId) -> Option<Range<usize>> {
        self.node_ranges.get(&node.0).cloned()
    }
}

// Node ranges are keyed by arena ids, which differ between two parses of the
// same text; equality is over what was matched, not which tree matched it.
impl PartialEq for MatchResult {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.range == other.range
            && self.marker_range == other.marker_range
            && self.ambiguous == other.ambiguous
            && self.fingerprint == other.fingerprint
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguityReport {
    /// Number of structurally distinct occurrences.
    pub distinct: usize,
    /// Start marker of every occurrence, in instruction order.
    pub positions: Vec<usize>,
}

impl fmt::Display for AmbiguityReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "pattern matches {} structurally distinct sites (at {})",
            self.distinct,
            self.positions.iter().join(", ")
        )
    }
}

/// No-match and ambiguity are results, not errors; callers branch on the
/// variant.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    NoMatch,
    Found(Vec<MatchResult>),
    Ambiguous {
        matches: Vec<MatchResult>,
        report: AmbiguityReport,
    },
}

impl MatchOutcome {
    pub fn matches(&self) -> &[MatchResult] {
        match self {
            MatchOutcome::NoMatch => &[],
            MatchOutcome::Found(m) | MatchOutcome::Ambiguous { matches: m, .. } => m,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, MatchOutcome::Ambiguous { .. })
    }
}

/// Operand provenance of one instruction: `operands[k]` is the index of the
/// instruction that produced the k-th popped value (bottom of the pops
/// first), and `start` is the first instruction of this subtree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Frame {
    pub start: usize,
    pub operands: Vec<usize>,
}

pub(crate) fn simulate(insns: &[Instruction]) -> Result<Vec<Frame>, TargetError> {
    let mut stack: Vec<usize> = Vec::new();
    let mut frames: Vec<Frame> = Vec::with_capacity(insns.len());
    for (i, insn) in insns.iter().enumerate() {
        let arity = insn.kind.arity();
        if stack.len() < arity {
            return Err(TargetError::StackUnderflow { at: i });
        }
        let operands = stack.split_off(stack.len() - arity);
        let start = operands.first().map_or(i, |&f| frames[f].start);
        frames.push(Frame { start, operands });
        if insn.kind.pushes() {
            stack.push(i);
        }
    }
    Ok(frames)
}

#[derive(Default)]
struct MatchState {
    node_ranges: BTreeMap<ExprKey, Range<usize>>,
    /// Flat rendering of what this occurrence bound: resolved symbols and
    /// `$` for anything a wildcard absorbed. Two occurrences are
    /// structurally identical iff their fingerprints are equal.
    fingerprint: String,
}

struct Matcher<'a> {
    insns: &'a [Instruction],
    frames: Vec<Frame>,
    classes: &'a ClassTable,
}

impl<'a> Matcher<'a> {
    fn record(&self, node: ExprNodeId, idx: usize, st: &mut MatchState) {
        st.node_ranges.insert(node.0, self.frames[idx].start..idx + 1);
    }

    /// Canonical name for a descriptor token, falling back to the raw token
    /// when the class table has no entry.
    fn canon(&self, tok: Symbol) -> String {
        self.classes
            .resolve(tok.as_str())
            .map_or_else(|_| tok.to_string(), |t| t.to_string())
    }

    fn resolved_path(&self, ty: &TypePath, extra_rank: usize) -> Option<TypeDesc> {
        match self.classes.resolve_path(ty) {
            Ok(mut desc) => {
                for _ in 0..extra_rank {
                    desc = TypeDesc::Array(Box::new(desc));
                }
                Some(desc)
            }
            Err(e) => {
                log::trace!("pattern type does not resolve: {e}");
                None
            }
        }
    }

    fn type_equal(&self, ty: &TypePath, extra_rank: usize, tok: Symbol) -> bool {
        let Some(want) = self.resolved_path(ty, extra_rank) else {
            return false;
        };
        match self.classes.resolve(tok.as_str()) {
            Ok(got) => want == got,
            Err(e) => {
                log::trace!("instruction type does not resolve: {e}");
                false
            }
        }
    }

    /// Dotted name reconstructed from a `Var`/`FieldAccess` chain, the shape
    /// a static owner is written in.
    fn static_name(node: ExprNodeId) -> Option<String> {
        match node.to_expr() {
            Expr::Var(s) => Some(s.to_string()),
            Expr::FieldAccess(owner, f) => Some(format!("{}.{f}", Self::static_name(owner)?)),
            Expr::Paren(inner) => Self::static_name(inner),
            _ => None,
        }
    }

    /// Matches a pattern node written in owner position of a static member
    /// against the member's owner token. Consumes no instructions.
    fn static_owner(&self, node: ExprNodeId, owner_tok: Symbol, st: &mut MatchState) -> bool {
        if let Expr::Literal(Literal::PlaceHolder) = node.to_expr() {
            st.fingerprint.push('$');
            return true;
        }
        match Self::static_name(node) {
            Some(name) => self.type_equal(&TypePath::Class(name.to_symbol()), 0, owner_tok),
            None => false,
        }
    }

    fn match_literal(&self, lit: &Literal, kind: &InsnKind, st: &mut MatchState) -> bool {
        let ok = match (lit, kind) {
            (Literal::Int(v), InsnKind::ConstInt(w)) => v == w,
            // numeric literals compare by value across widths
            (Literal::Int(v), InsnKind::ConstFloat(w)) => (*v as f64) == *w,
            (Literal::Float(s), InsnKind::ConstFloat(w)) => {
                s.as_str().parse::<f64>().is_ok_and(|v| v == *w)
            }
            (Literal::String(s), InsnKind::ConstStr(t)) => s == t,
            (Literal::Bool(b), InsnKind::ConstBool(c)) => b == c,
            (Literal::Null, InsnKind::ConstNull) => true,
            (Literal::This, InsnKind::LoadThis) => true,
            _ => false,
        };
        if ok {
            let _ = write!(st.fingerprint, "lit:{lit};");
        }
        ok
    }

    /// Matches `node` against the subtree whose final instruction sits at
    /// `idx`. Deterministic: the only choice points are keyed off the
    /// instruction kind, so a failed candidate never needs unwinding.
    fn match_node(&self, node: ExprNodeId, idx: usize, st: &mut MatchState) -> bool {
        self.record(node, idx, st);
        let kind = &self.insns[idx].kind;
        let ops = &self.frames[idx].operands;
        match node.to_expr() {
            Expr::Paren(inner) => self.match_node(inner, idx, st),
            Expr::Literal(Literal::PlaceHolder) => {
                st.fingerprint.push('$');
                true
            }
            Expr::Literal(lit) => self.match_literal(&lit, kind, st),
            Expr::Var(name) => match kind {
                InsnKind::LocalLoad(n) if *n == name => {
                    let _ = write!(st.fingerprint, "local:{n};");
                    true
                }
                InsnKind::FieldLoad {
                    owner,
                    name: fname,
                    receiver,
                } if *fname == name => {
                    // unqualified names also stand for implicit-this and
                    // static fields
                    let implicit =
                        !receiver || matches!(self.insns[ops[0]].kind, InsnKind::LoadThis);
                    if implicit {
                        let _ = write!(st.fingerprint, "field:{}.{name};", self.canon(*owner));
                    }
                    implicit
                }
                _ => false,
            },
            Expr::FieldAccess(owner_node, fname) => match kind {
                InsnKind::FieldLoad {
                    owner,
                    name,
                    receiver,
                } if *name == fname => {
                    let _ = write!(st.fingerprint, "field:{}.{name}(", self.canon(*owner));
                    let ok = if *receiver {
                        self.match_node(owner_node, ops[0], st)
                    } else {
                        self.static_owner(owner_node, *owner, st)
                    };
                    st.fingerprint.push_str(");");
                    ok
                }
                _ => false,
            },
            Expr::MethodCall(owner_opt, name, args) => match kind {
                InsnKind::Call {
                    owner,
                    name: cname,
                    argc,
                    receiver,
                    ..
                } if *cname == name && *argc == args.len() => {
                    let _ = write!(
                        st.fingerprint,
                        "call:{}.{name}/{argc}(",
                        self.canon(*owner)
                    );
                    let arg_ops = if *receiver { &ops[1..] } else { &ops[..] };
                    let owner_ok = match owner_opt {
                        // an unqualified call is an implicit-this or static
                        // call on the enclosing class
                        None => !receiver || matches!(self.insns[ops[0]].kind, InsnKind::LoadThis),
                        Some(o) if *receiver => self.match_node(o, ops[0], st),
                        Some(o) => self.static_owner(o, *owner, st),
                    };
                    let ok = owner_ok
                        && args
                            .iter()
                            .zip(arg_ops)
                            .all(|(a, &i)| self.match_node(*a, i, st));
                    st.fingerprint.push_str(");");
                    ok
                }
                _ => false,
            },
            Expr::NewInstance(ty, args) => match kind {
                InsnKind::NewInstance { class, argc }
                    if *argc == args.len() && self.type_equal(&ty, 0, *class) =>
                {
                    let _ = write!(
                        st.fingerprint,
                        "new:{}/{argc}(",
                        self.canon(*class)
                    );
                    let ok = args
                        .iter()
                        .zip(ops)
                        .all(|(a, &i)| self.match_node(*a, i, st));
                    st.fingerprint.push_str(");");
                    ok
                }
                _ => false,
            },
            Expr::NewArray(ty, dims, None) => match kind {
                InsnKind::NewArray { elem, dims: d }
                    if *d == dims.len() && self.type_equal(&ty, 0, *elem) =>
                {
                    let _ = write!(
                        st.fingerprint,
                        "newarray:{}/{d}(",
                        self.canon(*elem)
                    );
                    let ok = dims.iter().zip(ops).all(|(dim, &i)| match dim {
                        Dimension::Sized(e) => self.match_node(*e, i, st),
                        // bare [] absorbs any size operand
                        Dimension::Wildcard => {
                            st.fingerprint.push('$');
                            true
                        }
                    });
                    st.fingerprint.push_str(");");
                    ok
                }
                _ => false,
            },
            Expr::NewArray(ty, dims, Some(init)) => match kind {
                InsnKind::ArrayFill { elem, len }
                    if *len == init.len() && self.type_equal(&ty, dims.len() - 1, *elem) =>
                {
                    let _ = write!(
                        st.fingerprint,
                        "arrayfill:{}/{len}(",
                        self.canon(*elem)
                    );
                    let ok = init
                        .iter()
                        .zip(ops)
                        .all(|(e, &i)| self.match_node(*e, i, st));
                    st.fingerprint.push_str(");");
                    ok
                }
                _ => false,
            },
            Expr::ArrayAccess(arr, index) => match kind {
                InsnKind::ArrayLoad => {
                    st.fingerprint.push_str("aload(");
                    let ok =
                        self.match_node(arr, ops[0], st) && self.match_node(index, ops[1], st);
                    st.fingerprint.push_str(");");
                    ok
                }
                _ => false,
            },
            Expr::Assign(target, value) => self.match_store(target, value, idx, st),
            Expr::UniOp((op, _), operand) => match kind {
                InsnKind::UnaryOp(o) if *o == op => {
                    let _ = write!(st.fingerprint, "unary:{op}(");
                    let ok = self.match_node(operand, ops[0], st);
                    st.fingerprint.push_str(");");
                    ok
                }
                // negated literals are usually folded into the constant
                InsnKind::ConstInt(w) if op == Op::Minus => {
                    if let Expr::Literal(Literal::Int(v)) = operand.to_expr()
                        && *w == -v
                    {
                        self.record(operand, idx, st);
                        let _ = write!(st.fingerprint, "lit:{w};");
                        true
                    } else {
                        false
                    }
                }
                InsnKind::ConstFloat(w) if op == Op::Minus => {
                    if let Expr::Literal(Literal::Float(s)) = operand.to_expr()
                        && s.as_str().parse::<f64>().is_ok_and(|v| -v == *w)
                    {
                        self.record(operand, idx, st);
                        let _ = write!(st.fingerprint, "lit:{w};");
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            },
            Expr::BinOp(lhs, (op, _), rhs) => match kind {
                InsnKind::BinOp(o) if *o == op => {
                    let _ = write!(st.fingerprint, "binop:{op}(");
                    let ok = self.match_node(lhs, ops[0], st) && self.match_node(rhs, ops[1], st);
                    st.fingerprint.push_str(");");
                    ok
                }
                _ => false,
            },
            Expr::Cast(ty, operand) => match kind {
                InsnKind::Cast(t) if self.type_equal(&ty, 0, *t) => {
                    let _ = write!(st.fingerprint, "cast:{}(", self.canon(*t));
                    let ok = self.match_node(operand, ops[0], st);
                    st.fingerprint.push_str(");");
                    ok
                }
                _ => false,
            },
            Expr::Error => false,
        }
    }

    fn match_store(
        &self,
        target: ExprNodeId,
        value: ExprNodeId,
        idx: usize,
        st: &mut MatchState,
    ) -> bool {
        let kind = &self.insns[idx].kind;
        let ops = &self.frames[idx].operands;
        let wildcard_target = matches!(target.to_expr(), Expr::Literal(Literal::PlaceHolder));
        st.fingerprint.push_str("store:(");
        let ok = match kind {
            InsnKind::LocalStore(n) => {
                let t_ok = if wildcard_target {
                    st.fingerprint.push('$');
                    true
                } else if let Expr::Var(name) = target.to_expr() {
                    let hit = name == *n;
                    if hit {
                        let _ = write!(st.fingerprint, "local:{n}");
                    }
                    hit
                } else {
                    false
                };
                t_ok && {
                    st.fingerprint.push(',');
                    self.match_node(value, ops[0], st)
                }
            }
            InsnKind::FieldStore {
                owner,
                name,
                receiver,
            } => {
                let value_op = *ops.last().unwrap_or(&0);
                let t_ok = if wildcard_target {
                    st.fingerprint.push('$');
                    true
                } else {
                    match target.to_expr() {
                        Expr::FieldAccess(owner_node, fname) if fname == *name => {
                            let _ =
                                write!(st.fingerprint, "field:{}.{name}(", self.canon(*owner));
                            let ok = if *receiver {
                                self.match_node(owner_node, ops[0], st)
                            } else {
                                self.static_owner(owner_node, *owner, st)
                            };
                            st.fingerprint.push(')');
                            ok
                        }
                        // an unqualified name also stores to implicit-this
                        // and static fields
                        Expr::Var(vname) if vname == *name => {
                            let implicit = !receiver
                                || matches!(self.insns[ops[0]].kind, InsnKind::LoadThis);
                            if implicit {
                                let _ =
                                    write!(st.fingerprint, "field:{}.{name}", self.canon(*owner));
                            }
                            implicit
                        }
                        _ => false,
                    }
                };
                t_ok && {
                    st.fingerprint.push(',');
                    self.match_node(value, value_op, st)
                }
            }
            InsnKind::ArrayStore => {
                let t_ok = if wildcard_target {
                    st.fingerprint.push('$');
                    true
                } else if let Expr::ArrayAccess(arr, index) = target.to_expr() {
                    st.fingerprint.push_str("aslot(");
                    let ok =
                        self.match_node(arr, ops[0], st) && self.match_node(index, ops[1], st);
                    st.fingerprint.push(')');
                    ok
                } else {
                    false
                };
                t_ok && {
                    st.fingerprint.push(',');
                    self.match_node(value, ops[2], st)
                }
            }
            _ => false,
        };
        st.fingerprint.push_str(");");
        ok
    }
}

/// Finds every non-overlapping occurrence of `pattern` in `insns`, in
/// instruction order. `Err` means the target stream itself is malformed.
pub fn find_matches(
    pattern: ExprNodeId,
    insns: &[Instruction],
    classes: &ClassTable,
) -> Result<MatchOutcome, TargetError> {
    let frames = simulate(insns)?;
    let matcher = Matcher {
        insns,
        frames,
        classes,
    };
    let mut results: Vec<MatchResult> = Vec::new();
    let mut last_end = 0usize;
    for i in 0..insns.len() {
        if matcher.frames[i].start < last_end {
            continue;
        }
        let mut st = MatchState::default();
        if matcher.match_node(pattern, i, &mut st) {
            let range = matcher.frames[i].start..i + 1;
            log::trace!("occurrence at {range:?}: {}", st.fingerprint);
            last_end = range.end;
            results.push(MatchResult {
                root: pattern,
                marker_range: (insns[range.start].marker, insns[range.end - 1].marker),
                range,
                ambiguous: false,
                node_ranges: st.node_ranges,
                fingerprint: st.fingerprint,
            });
        }
    }
    if results.is_empty() {
        return Ok(MatchOutcome::NoMatch);
    }
    let distinct = results
        .iter()
        .map(|r| r.fingerprint.as_str())
        .unique()
        .count();
    if distinct > 1 {
        let report = AmbiguityReport {
            distinct,
            positions: results.iter().map(|r| r.marker_range.0).collect(),
        };
        log::debug!("{report}");
        for r in &mut results {
            r.ambiguous = true;
        }
        Ok(MatchOutcome::Ambiguous {
            matches: results,
            report,
        })
    } else {
        Ok(MatchOutcome::Found(results))
    }
}

/// One match attributed to a target method, for cross-method aggregation.
/// The method name is owned so batches can be produced on worker threads and
/// merged elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchMatch {
    pub method: String,
    pub result: MatchResult,
}

/// Merges per-worker result batches into one list ordered by (method,
/// start offset). The output is independent of how the work was
/// partitioned.
pub fn merge_batches(batches: impl IntoIterator<Item = Vec<BatchMatch>>) -> Vec<BatchMatch> {
    let mut all: Vec<BatchMatch> = batches.into_iter().flatten().collect();
    all.sort_by(|a, b| {
        a.method
            .cmp(&b.method)
            .then(a.result.range.start.cmp(&b.result.range.start))
    });
    all
}
