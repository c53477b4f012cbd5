//! Decoding of type descriptors and resolution of type names against an
//! immutable class-index snapshot.
//!
//! Both sides of a match speak in descriptors: the parser produces bare
//! (possibly qualified) names from `new`/cast positions, while instruction
//! operands typically carry single-letter primitive codes, `[`-prefixed array
//! encodings or `L<name>;` object encodings. [`ClassTable::resolve`] maps all
//! of these onto one canonical [`TypeDesc`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::ast::TypePath;
use crate::interner::{Symbol, ToSymbol};

/// The eight primitive letter codes of the descriptor grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Byte,    // B
    Char,    // C
    Double,  // D
    Float,   // F
    Int,     // I
    Long,    // J
    Short,   // S
    Boolean, // Z
}

impl Primitive {
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'B' => Some(Primitive::Byte),
            'C' => Some(Primitive::Char),
            'D' => Some(Primitive::Double),
            'F' => Some(Primitive::Float),
            'I' => Some(Primitive::Int),
            'J' => Some(Primitive::Long),
            'S' => Some(Primitive::Short),
            'Z' => Some(Primitive::Boolean),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Primitive::Byte => 'B',
            Primitive::Char => 'C',
            Primitive::Double => 'D',
            Primitive::Float => 'F',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Short => 'S',
            Primitive::Boolean => 'Z',
        }
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        match kw {
            "byte" => Some(Primitive::Byte),
            "char" => Some(Primitive::Char),
            "double" => Some(Primitive::Double),
            "float" => Some(Primitive::Float),
            "int" => Some(Primitive::Int),
            "long" => Some(Primitive::Long),
            "short" => Some(Primitive::Short),
            "boolean" => Some(Primitive::Boolean),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Double => "double",
            Primitive::Float => "float",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Short => "short",
            Primitive::Boolean => "boolean",
        }
    }
}

/// Canonical type identity produced by resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Primitive(Primitive),
    /// Fully qualified, dot-separated class name.
    Class(Symbol),
    Array(Box<TypeDesc>),
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeDesc::Primitive(p) => write!(f, "{}", p.keyword()),
            TypeDesc::Class(name) => write!(f, "{name}"),
            TypeDesc::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedTypeError {
    pub name: String,
}

impl fmt::Display for UnresolvedTypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unresolved type: {}", self.name)
    }
}
impl std::error::Error for UnresolvedTypeError {}

/// Read-only snapshot of the project's class index. Built once per index
/// generation and then only read, possibly from many workers at once; all
/// lookups take `&self`. Names are stored as owned strings rather than
/// interned symbols so the snapshot stays valid when it crosses a thread
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    qualified: HashSet<String>,
    by_simple: HashMap<String, String>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for name in names {
            table.insert(name.as_ref());
        }
        table
    }

    /// Register a fully qualified class name. The first class to claim a
    /// simple name wins; later collisions only resolve via their qualified
    /// name.
    pub fn insert(&mut self, qualified: &str) {
        let qualified = qualified.replace('/', ".");
        let simple = qualified
            .rsplit('.')
            .next()
            .unwrap_or(&qualified)
            .to_string();
        if let Some(prev) = self.by_simple.get(&simple) {
            if *prev != qualified {
                log::debug!("simple name {simple} is claimed by {prev}, skipping {qualified}");
            }
        } else {
            self.by_simple.insert(simple, qualified.clone());
        }
        self.qualified.insert(qualified);
    }

    /// Resolve one type token to its canonical identity. Accepts primitive
    /// letter codes and keywords, `[`-prefixed or `[]`-suffixed array
    /// encodings, `L<name>;` object encodings (dots or slashes) and bare
    /// qualified/simple names.
    pub fn resolve(&self, token: &str) -> Result<TypeDesc, UnresolvedTypeError> {
        let token = token.trim();
        if let Some(inner) = token.strip_prefix('[') {
            return Ok(TypeDesc::Array(Box::new(self.resolve(inner)?)));
        }
        if let Some(inner) = token.strip_suffix("[]") {
            return Ok(TypeDesc::Array(Box::new(self.resolve(inner)?)));
        }
        if token.len() == 1
            && let Some(p) = Primitive::from_code(token.chars().next().unwrap_or_default())
        {
            return Ok(TypeDesc::Primitive(p));
        }
        if let Some(p) = Primitive::from_keyword(token) {
            return Ok(TypeDesc::Primitive(p));
        }
        let name = token
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap_or(token)
            .replace('/', ".");
        if name.contains('.') {
            if self.qualified.contains(&name) {
                return Ok(TypeDesc::Class(name.to_symbol()));
            }
        } else if let Some(qualified) = self.by_simple.get(&name) {
            return Ok(TypeDesc::Class(qualified.to_symbol()));
        }
        Err(UnresolvedTypeError { name })
    }

    pub fn resolve_path(&self, path: &TypePath) -> Result<TypeDesc, UnresolvedTypeError> {
        match path {
            TypePath::Primitive(p) => Ok(TypeDesc::Primitive(*p)),
            TypePath::Class(name) => self.resolve(name.as_str()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> ClassTable {
        ClassTable::snapshot(["com.example.Foo", "com.example.util.Bar", "java.lang.String"])
    }

    #[test]
    fn primitives_resolve_without_table() {
        let t = ClassTable::new();
        assert_eq!(t.resolve("I"), Ok(TypeDesc::Primitive(Primitive::Int)));
        assert_eq!(t.resolve("int"), Ok(TypeDesc::Primitive(Primitive::Int)));
        assert_eq!(
            t.resolve("Z"),
            Ok(TypeDesc::Primitive(Primitive::Boolean))
        );
    }

    #[test]
    fn array_encodings_recurse() {
        let t = table();
        assert_eq!(
            t.resolve("[I"),
            Ok(TypeDesc::Array(Box::new(TypeDesc::Primitive(
                Primitive::Int
            ))))
        );
        assert_eq!(
            t.resolve("[[D"),
            Ok(TypeDesc::Array(Box::new(TypeDesc::Array(Box::new(
                TypeDesc::Primitive(Primitive::Double)
            )))))
        );
        assert_eq!(
            t.resolve("int[]"),
            Ok(TypeDesc::Array(Box::new(TypeDesc::Primitive(
                Primitive::Int
            ))))
        );
    }

    #[test]
    fn object_encodings_and_bare_names() {
        let t = table();
        let expected = TypeDesc::Class("com.example.Foo".to_symbol());
        assert_eq!(t.resolve("Lcom/example/Foo;"), Ok(expected.clone()));
        assert_eq!(t.resolve("Lcom.example.Foo;"), Ok(expected.clone()));
        assert_eq!(t.resolve("com.example.Foo"), Ok(expected.clone()));
        assert_eq!(t.resolve("Foo"), Ok(expected));
    }

    #[test]
    fn snapshot_resolves_on_other_threads() {
        let t = table();
        std::thread::spawn(move || {
            assert_eq!(
                t.resolve("Foo"),
                Ok(TypeDesc::Class("com.example.Foo".to_symbol()))
            );
            assert_eq!(
                t.resolve("Lcom/example/Foo;"),
                Ok(TypeDesc::Class("com.example.Foo".to_symbol()))
            );
        })
        .join()
        .unwrap();
    }

    #[test]
    fn unknown_names_fail() {
        let t = table();
        assert!(t.resolve("Quux").is_err());
        assert!(t.resolve("com.example.Quux").is_err());
        assert!(t.resolve("[Lcom.example.Quux;").is_err());
    }
}
