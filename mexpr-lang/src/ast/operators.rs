use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Sum,     // +
    Minus,   // -
    Product, // *
    Divide,  // /
    Modulo,  // %

    Equal,        // ==
    NotEqual,     // !=
    LessThan,     // <
    LessEqual,    // <=
    GreaterThan,  // >
    GreaterEqual, // >=

    Shl,  // <<
    Shr,  // >>
    UShr, // >>>

    BitAnd, // &
    BitOr,  // |
    BitXor, // ^

    And, // &&
    Or,  // ||

    Not,    // ! (prefix only)
    BitNot, // ~ (prefix only)

    Unknown(String),
}

/// Binary operators grouped by precedence, loosest first. The parser folds
/// these levels in reverse and the printer consults the same table, so the
/// two can never disagree.
pub const BINARY_LEVELS: &[&[Op]] = &[
    &[Op::Or],
    &[Op::And],
    &[Op::BitOr],
    &[Op::BitXor],
    &[Op::BitAnd],
    &[Op::Equal, Op::NotEqual],
    &[
        Op::LessThan,
        Op::LessEqual,
        Op::GreaterThan,
        Op::GreaterEqual,
    ],
    &[Op::Shl, Op::Shr, Op::UShr],
    &[Op::Sum, Op::Minus],
    &[Op::Product, Op::Divide, Op::Modulo],
];

impl Op {
    /// Binding strength used by the canonical printer. Assignment is 1, the
    /// loosest binary level starts at 2, unary and postfix sit above all
    /// binary levels.
    pub fn precedence(&self) -> u8 {
        BINARY_LEVELS
            .iter()
            .position(|level| level.contains(self))
            .map(|i| i as u8 + 2)
            .unwrap_or(u8::MAX)
    }
}

impl From<&str> for Op {
    fn from(s: &str) -> Self {
        match s {
            "+" => Op::Sum,
            "-" => Op::Minus,
            "*" => Op::Product,
            "/" => Op::Divide,
            "%" => Op::Modulo,
            "==" => Op::Equal,
            "!=" => Op::NotEqual,
            "<" => Op::LessThan,
            "<=" => Op::LessEqual,
            ">" => Op::GreaterThan,
            ">=" => Op::GreaterEqual,
            "<<" => Op::Shl,
            ">>" => Op::Shr,
            ">>>" => Op::UShr,
            "&" => Op::BitAnd,
            "|" => Op::BitOr,
            "^" => Op::BitXor,
            "&&" => Op::And,
            "||" => Op::Or,
            "!" => Op::Not,
            "~" => Op::BitNot,
            other => Op::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::Sum => write!(f, "+"),
            Op::Minus => write!(f, "-"),
            Op::Product => write!(f, "*"),
            Op::Divide => write!(f, "/"),
            Op::Modulo => write!(f, "%"),
            Op::Equal => write!(f, "=="),
            Op::NotEqual => write!(f, "!="),
            Op::LessThan => write!(f, "<"),
            Op::LessEqual => write!(f, "<="),
            Op::GreaterThan => write!(f, ">"),
            Op::GreaterEqual => write!(f, ">="),
            Op::Shl => write!(f, "<<"),
            Op::Shr => write!(f, ">>"),
            Op::UShr => write!(f, ">>>"),
            Op::BitAnd => write!(f, "&"),
            Op::BitOr => write!(f, "|"),
            Op::BitXor => write!(f, "^"),
            Op::And => write!(f, "&&"),
            Op::Or => write!(f, "||"),
            Op::Not => write!(f, "!"),
            Op::BitNot => write!(f, "~"),
            Op::Unknown(x) => write!(f, "{x}"),
        }
    }
}
