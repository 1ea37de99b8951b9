//! Aggregate expression trees
//!
//! A closed expression vocabulary over the physical sessions table. Trees
//! are built fresh for every compilation (modifiers such as the bounce
//! duration threshold or custom channel rules feed into them, so they are
//! not globally static), owned by that compilation, and never mutated
//! after construction. Rendering to SQL text is the responsibility of a
//! downstream printing layer.

use chrono::{DateTime, Utc};

/// One segment of a field access chain (table, column, nested key, or
/// array index).
#[derive(Debug, Clone, PartialEq)]
pub enum ChainSegment {
    Key(String),
    Index(i64),
}

impl From<&str> for ChainSegment {
    fn from(s: &str) -> Self {
        ChainSegment::Key(s.to_string())
    }
}

impl From<String> for ChainSegment {
    fn from(s: String) -> Self {
        ChainSegment::Key(s)
    }
}

impl From<i64> for ChainSegment {
    fn from(i: i64) -> Self {
        ChainSegment::Index(i)
    }
}

/// Partial-aggregate reconstruction and aggregation functions
///
/// Each variant names how a physical column's per-batch partial states
/// are combined into one value per session group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Any single value from the group (identifiers, constant per session)
    AnyValue,
    /// Minimum over the group (session start timestamp)
    Min,
    /// Maximum over the group (session end timestamp)
    Max,
    /// Sum over the group (event counters)
    Sum,
    /// Key-wise sum of per-batch count maps
    SumMap,
    /// Merge of argMin partial states (value at earliest timestamp)
    ArgMinMerge,
    /// Merge of argMax partial states (value at latest timestamp)
    ArgMaxMerge,
    /// Flatten per-batch arrays and keep distinct elements (URL lists)
    ArrayDistinctUnion,
}

/// Scalar function vocabulary for derived fields and filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunc {
    NullIf,
    /// Path component of a URL
    Path,
    /// Domain component of a URL
    Domain,
    /// Difference between two datetimes; first operand is the unit literal
    DateDiff,
    /// Array length
    Length,
    Not,
    Or,
    And,
    Equals,
    NotEquals,
    Greater,
    GreaterOrEquals,
    Less,
    LessOrEquals,
    /// Conditional: (condition, then, else)
    If,
    IsNull,
    IsNotNull,
    /// Membership: first operand is the needle, the rest form the set
    In,
    /// Negated membership, same operand shape as `In`
    NotIn,
    Lower,
    Like,
    NotLike,
    /// Regular expression match
    Match,
    Coalesce,
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

/// An aggregate expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Raw column reference via its access chain
    Column(Vec<ChainSegment>),
    /// Aggregation of a physical column of the sessions table
    Merge(MergeKind, String),
    /// Scalar function application
    Call(ScalarFunc, Vec<Expr>),
    /// Constant
    Literal(Value),
}

impl Expr {
    /// Column reference from name segments
    pub fn column<'a>(segments: impl IntoIterator<Item = &'a str>) -> Expr {
        Expr::Column(segments.into_iter().map(ChainSegment::from).collect())
    }

    /// Column reference from an already-built chain
    pub fn column_chain(chain: Vec<ChainSegment>) -> Expr {
        Expr::Column(chain)
    }

    /// Aggregation of a physical column
    pub fn merge(kind: MergeKind, column: impl Into<String>) -> Expr {
        Expr::Merge(kind, column.into())
    }

    /// Scalar function application
    pub fn call(func: ScalarFunc, args: Vec<Expr>) -> Expr {
        Expr::Call(func, args)
    }

    /// Constant
    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    /// The null constant
    pub fn null() -> Expr {
        Expr::Literal(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builder() {
        let expr = Expr::column(["sessions", "session_id"]);
        assert_eq!(
            expr,
            Expr::Column(vec![
                ChainSegment::Key("sessions".into()),
                ChainSegment::Key("session_id".into()),
            ])
        );
    }

    #[test]
    fn test_structural_equality() {
        let a = Expr::call(
            ScalarFunc::NullIf,
            vec![
                Expr::merge(MergeKind::ArgMinMerge, "entry_url"),
                Expr::lit(""),
            ],
        );
        let b = Expr::call(
            ScalarFunc::NullIf,
            vec![
                Expr::merge(MergeKind::ArgMinMerge, "entry_url"),
                Expr::lit(""),
            ],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_literal_conversions() {
        assert_eq!(Expr::lit(1i64), Expr::Literal(Value::Int(1)));
        assert_eq!(Expr::lit("x"), Expr::Literal(Value::String("x".into())));
        assert_eq!(Expr::lit(true), Expr::Literal(Value::Bool(true)));
        assert_eq!(Expr::null(), Expr::Literal(Value::Null));
    }

    #[test]
    fn test_chain_segment_from_index() {
        assert_eq!(ChainSegment::from(3i64), ChainSegment::Index(3));
    }
}
