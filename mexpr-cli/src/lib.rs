use std::path::PathBuf;

use mexpr_lang::{
    BatchMatch, MatchOutcome, Pattern,
    ast::operators::Op,
    descriptor::ClassTable,
    instruction::{InsnKind, Instruction},
    interner::ToSymbol,
    log, merge_batches,
    utils::miniprint::MiniPrint,
};
use serde::Deserialize;

#[derive(clap::Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Pattern expression, e.g. "this.items[i] = new Foo($)"
    #[clap(value_parser)]
    pub pattern: String,

    /// JSON instruction dump to search: a list of {"name", "instructions"}
    /// method records.
    #[arg(long, short)]
    pub target: Option<PathBuf>,

    /// File with one fully qualified class name per line, used to resolve
    /// type names on both sides of the match.
    #[arg(long)]
    pub classes: Option<PathBuf>,

    /// Print the parsed tree and exit
    #[arg(long, default_value_t = false)]
    pub emit_ast: bool,
}

/// One method record of a target dump.
#[derive(Debug, Deserialize)]
pub struct MethodDump {
    pub name: String,
    pub instructions: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RawEntry {
    #[serde(flatten)]
    pub insn: RawInsn,
    /// Opaque position marker; defaults to the instruction index.
    #[serde(default)]
    pub marker: Option<usize>,
}

fn default_true() -> bool {
    true
}

/// Wire form of [`InsnKind`], with plain strings where the engine interns
/// symbols.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawInsn {
    ConstInt {
        value: i64,
    },
    ConstFloat {
        value: f64,
    },
    ConstStr {
        value: String,
    },
    ConstBool {
        value: bool,
    },
    ConstNull,
    LoadThis,
    LocalLoad {
        name: String,
    },
    LocalStore {
        name: String,
    },
    FieldLoad {
        owner: String,
        name: String,
        #[serde(default = "default_true")]
        receiver: bool,
    },
    FieldStore {
        owner: String,
        name: String,
        #[serde(default = "default_true")]
        receiver: bool,
    },
    Call {
        owner: String,
        name: String,
        #[serde(default)]
        argc: usize,
        #[serde(default = "default_true")]
        receiver: bool,
        #[serde(default = "default_true")]
        returns: bool,
    },
    NewInstance {
        class: String,
        #[serde(default)]
        argc: usize,
    },
    NewArray {
        elem: String,
        #[serde(default)]
        dims: usize,
    },
    ArrayFill {
        elem: String,
        #[serde(default)]
        len: usize,
    },
    ArrayLoad,
    ArrayStore,
    UnaryOp {
        op: String,
    },
    BinOp {
        op: String,
    },
    Cast {
        to: String,
    },
}

impl RawInsn {
    fn into_kind(self) -> InsnKind {
        match self {
            RawInsn::ConstInt { value } => InsnKind::ConstInt(value),
            RawInsn::ConstFloat { value } => InsnKind::ConstFloat(value),
            RawInsn::ConstStr { value } => InsnKind::ConstStr(value.to_symbol()),
            RawInsn::ConstBool { value } => InsnKind::ConstBool(value),
            RawInsn::ConstNull => InsnKind::ConstNull,
            RawInsn::LoadThis => InsnKind::LoadThis,
            RawInsn::LocalLoad { name } => InsnKind::LocalLoad(name.to_symbol()),
            RawInsn::LocalStore { name } => InsnKind::LocalStore(name.to_symbol()),
            RawInsn::FieldLoad {
                owner,
                name,
                receiver,
            } => InsnKind::FieldLoad {
                owner: owner.to_symbol(),
                name: name.to_symbol(),
                receiver,
            },
            RawInsn::FieldStore {
                owner,
                name,
                receiver,
            } => InsnKind::FieldStore {
                owner: owner.to_symbol(),
                name: name.to_symbol(),
                receiver,
            },
            RawInsn::Call {
                owner,
                name,
                argc,
                receiver,
                returns,
            } => InsnKind::Call {
                owner: owner.to_symbol(),
                name: name.to_symbol(),
                argc,
                receiver,
                returns,
            },
            RawInsn::NewInstance { class, argc } => InsnKind::NewInstance {
                class: class.to_symbol(),
                argc,
            },
            RawInsn::NewArray { elem, dims } => InsnKind::NewArray {
                elem: elem.to_symbol(),
                dims,
            },
            RawInsn::ArrayFill { elem, len } => InsnKind::ArrayFill {
                elem: elem.to_symbol(),
                len,
            },
            RawInsn::ArrayLoad => InsnKind::ArrayLoad,
            RawInsn::ArrayStore => InsnKind::ArrayStore,
            RawInsn::UnaryOp { op } => InsnKind::UnaryOp(Op::from(op.as_str())),
            RawInsn::BinOp { op } => InsnKind::BinOp(Op::from(op.as_str())),
            RawInsn::Cast { to } => InsnKind::Cast(to.to_symbol()),
        }
    }
}

impl MethodDump {
    pub fn to_instructions(self) -> Vec<Instruction> {
        self.instructions
            .into_iter()
            .enumerate()
            .map(|(i, e)| Instruction::new(e.insn.into_kind(), e.marker.unwrap_or(i)))
            .collect()
    }
}

pub fn load_classes(path: &PathBuf) -> std::io::Result<ClassTable> {
    let text = std::fs::read_to_string(path)?;
    Ok(ClassTable::snapshot(
        text.lines().map(str::trim).filter(|l| !l.is_empty()),
    ))
}

pub fn load_targets(path: &PathBuf) -> Result<Vec<MethodDump>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn run(args: &Args, pattern: Pattern) -> Result<(), Box<dyn std::error::Error>> {
    if args.emit_ast {
        println!("{}", pattern.root().simple_print());
        return Ok(());
    }
    let classes = match &args.classes {
        Some(path) => load_classes(path)?,
        None => ClassTable::new(),
    };
    let Some(target) = &args.target else {
        // no target: just echo the canonical form as a syntax check
        println!("{}", pattern.to_source());
        return Ok(());
    };
    let mut batches = Vec::new();
    for dump in load_targets(target)? {
        let method = dump.name.clone();
        let insns = dump.to_instructions();
        match pattern.find_matches(&insns, &classes)? {
            MatchOutcome::NoMatch => log::info!("{method}: no match"),
            outcome => {
                if let MatchOutcome::Ambiguous { report, .. } = &outcome {
                    log::warn!("{method}: {report}");
                }
                batches.push(
                    outcome
                        .matches()
                        .iter()
                        .map(|result| BatchMatch {
                            method: method.clone(),
                            result: result.clone(),
                        })
                        .collect(),
                );
            }
        }
    }
    for m in merge_batches(batches) {
        let (from, to) = m.result.marker_range;
        println!(
            "{} {}..{} (markers {from}..{to}){}",
            m.method,
            m.result.range.start,
            m.result.range.end,
            if m.result.ambiguous { " [ambiguous]" } else { "" }
        );
    }
    Ok(())
}
