use bson::Bson;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;

/// Default wait window of an await-data read, mirroring a store's internal poll interval.
pub const DEFAULT_MAX_AWAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Filter {
    #[default]
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    Regex { path: String, pattern: String, case_insensitive: bool },
}

impl Filter {
    pub fn cmp(path: impl Into<String>, op: CmpOp, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op, value: value.into() }
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Eq, value)
    }

    /// Conjunction that flattens nested `And`s and drops `True`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                Self::True => {}
                Self::And(fs) => parts.extend(fs),
                f => parts.push(f),
            }
        }
        match parts.len() {
            0 => Self::True,
            1 => parts.pop().unwrap_or(Self::True),
            _ => Self::And(parts),
        }
    }

    /// Whether a top-level conjunct is exactly `path <op> value`.
    #[must_use]
    pub fn has_constraint(&self, path: &str, op: CmpOp, value: &Bson) -> bool {
        match self {
            Self::Cmp { path: p, op: o, value: v } => p == path && *o == op && v == value,
            Self::And(fs) => fs.iter().any(|f| f.has_constraint(path, op, value)),
            _ => false,
        }
    }
}

/// Cursor configuration handed to the store along with the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorOptions {
    pub tailable: bool,
    pub await_data: bool,
    pub batch_size: Option<u32>,
    /// Upper bound on a single blocking pull when `await_data` is set.
    pub max_await: Option<Duration>,
}

impl CursorOptions {
    #[must_use]
    pub const fn tailing() -> Self {
        Self { tailable: true, await_data: true, batch_size: None, max_await: None }
    }

    #[must_use]
    pub fn wait_window(&self) -> Duration {
        self.max_await.unwrap_or(DEFAULT_MAX_AWAIT)
    }
}
