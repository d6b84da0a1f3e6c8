use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH};

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Cmp { path, op, value } => match (get_path(doc, path), op) {
            (None, CmpOp::Ne) => true,
            (None, _) => false,
            (Some(v), CmpOp::Eq) => compare_bson(v, value) == Ordering::Equal,
            (Some(v), CmpOp::Ne) => compare_bson(v, value) != Ordering::Equal,
            (Some(v), CmpOp::Gt) => compare_bson(v, value) == Ordering::Greater,
            (Some(v), CmpOp::Gte) => compare_bson(v, value) != Ordering::Less,
            (Some(v), CmpOp::Lt) => compare_bson(v, value) == Ordering::Less,
            (Some(v), CmpOp::Lte) => compare_bson(v, value) != Ordering::Greater,
        },
        Filter::Regex { path, pattern, case_insensitive } => {
            if let Some(Bson::String(s)) = get_path(doc, path) {
                let mut re = regex::RegexBuilder::new(pattern);
                re.case_insensitive(*case_insensitive);
                re.build().is_ok_and(|r| r.is_match(s))
            } else {
                false
            }
        }
    }
}

fn is_in_set(v: &Bson, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| compare_bson(v, x) == Ordering::Equal)
}

fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() > MAX_PATH_DEPTH {
        return None;
    }
    let mut cur = doc;
    for (i, part) in parts.iter().enumerate() {
        match cur.get(*part) {
            Some(v) if i + 1 == parts.len() => return Some(v),
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    None
}

/// Total order over BSON values used by comparisons and resume bounds.
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    use bson::Bson as T;
    fn is_num(x: &T) -> bool {
        matches!(x, T::Int32(_) | T::Int64(_) | T::Double(_))
    }
    #[allow(clippy::cast_precision_loss)]
    fn as_f64_num(x: &T) -> f64 {
        match x {
            T::Int32(i) => f64::from(*i),
            T::Int64(i) => *i as f64,
            T::Double(f) => *f,
            _ => f64::NAN,
        }
    }
    match (a, b) {
        (T::Int32(x), T::Int32(y)) => x.cmp(y),
        (T::Int64(x), T::Int64(y)) => x.cmp(y),
        (x, y) if is_num(x) && is_num(y) => as_f64_num(x).total_cmp(&as_f64_num(y)),
        (T::String(x), T::String(y)) => x.cmp(y),
        (T::Boolean(x), T::Boolean(y)) => x.cmp(y),
        (T::ObjectId(x), T::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (T::DateTime(x), T::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        (T::Null, T::Null) => Ordering::Equal,
        _ if type_rank(a) == type_rank(b) => {
            if a == b { Ordering::Equal } else { format!("{a:?}").cmp(&format!("{b:?}")) }
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// Numbers share one rank so mixed-width numeric values compare by value.
fn type_rank(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::MinKey => 0,
        T::Null | T::Undefined => 1,
        T::Int32(_) | T::Int64(_) | T::Double(_) | T::Decimal128(_) => 2,
        T::String(_) | T::Symbol(_) => 3,
        T::Document(_) => 4,
        T::Array(_) => 5,
        T::Binary(_) => 6,
        T::ObjectId(_) => 7,
        T::Boolean(_) => 8,
        T::DateTime(_) => 9,
        T::Timestamp(_) => 10,
        T::RegularExpression(_) => 11,
        T::MaxKey => 255,
        _ => 12,
    }
}
