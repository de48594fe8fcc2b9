//! Typed key items and the composite key they make up.
//!
//! A `Key` is always a tuple of one or more `KeyItem`s: a non-composite
//! tree simply uses tuples of length one. `NegInf`/`PosInf` are the
//! always-less/always-greater sentinels used by the composite-key boundary
//! adapter (C7) and never appear in a stored key.

use std::cmp::Ordering;
use std::fmt;

/// The declared type of one field of a (possibly composite) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Varchar,
}

/// One comparable item of a key tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyItem {
    Integer(i64),
    Varchar(String),
    /// Always-less sentinel: compares below every real item.
    NegInf,
    /// Always-greater sentinel: compares above every real item.
    PosInf,
}

impl KeyItem {
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            KeyItem::Integer(_) => Some(FieldType::Integer),
            KeyItem::Varchar(_) => Some(FieldType::Varchar),
            KeyItem::NegInf | KeyItem::PosInf => None,
        }
    }
}

impl PartialOrd for KeyItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for KeyItem {}

impl Ord for KeyItem {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyItem::NegInf, KeyItem::NegInf) => Ordering::Equal,
            (KeyItem::NegInf, _) => Ordering::Less,
            (_, KeyItem::NegInf) => Ordering::Greater,
            (KeyItem::PosInf, KeyItem::PosInf) => Ordering::Equal,
            (KeyItem::PosInf, _) => Ordering::Greater,
            (_, KeyItem::PosInf) => Ordering::Less,
            (KeyItem::Integer(a), KeyItem::Integer(b)) => a.cmp(b),
            (KeyItem::Varchar(a), KeyItem::Varchar(b)) => a.cmp(b),
            // Mismatched real types never happen for a well-formed tree
            // (every field is validated against `keyTypes` on preprocess);
            // order by discriminant so comparisons stay total rather than
            // panicking mid-search.
            (a, b) => discriminant(a).cmp(&discriminant(b)),
        }
    }
}

fn discriminant(item: &KeyItem) -> u8 {
    match item {
        KeyItem::NegInf => 0,
        KeyItem::Integer(_) => 1,
        KeyItem::Varchar(_) => 2,
        KeyItem::PosInf => 3,
    }
}

impl fmt::Display for KeyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyItem::Integer(v) => write!(f, "{}", v),
            KeyItem::Varchar(v) => write!(f, "{:?}", v),
            KeyItem::NegInf => write!(f, "-inf"),
            KeyItem::PosInf => write!(f, "+inf"),
        }
    }
}

/// A (possibly composite) key: an ordered tuple of `KeyItem`s compared
/// lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key(pub Vec<KeyItem>);

impl Key {
    pub fn single(item: KeyItem) -> Self {
        Key(vec![item])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, ")")
    }
}
