use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};

use super::types::{CmpOp, Filter, MAX_IN_SET};

const MAX_NESTING: usize = 32;

/// Parse a Mongo-style JSON filter such as `{"level": {"$gte": 3}, "service": "api"}`.
///
/// Extended JSON values (`{"$oid": ...}`, `{"$date": ...}`) are accepted wherever a
/// value is expected.
///
/// # Errors
/// Returns an error if the JSON is malformed or uses an unknown operator.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    let doc: BsonDocument = serde_json::from_str(json)?;
    parse_filter_doc(&doc)
}

/// # Errors
/// Returns an error if the document uses an unknown operator or a malformed operand.
pub fn parse_filter_doc(doc: &BsonDocument) -> Result<Filter, DbError> {
    parse_doc(doc, 0)
}

fn parse_doc(doc: &BsonDocument, depth: usize) -> Result<Filter, DbError> {
    if depth > MAX_NESTING {
        return Err(DbError::QueryError("filter nested too deeply".into()));
    }
    let mut out = Filter::True;
    for (key, value) in doc {
        let part = match key.as_str() {
            "$and" => Filter::And(parse_list(value, depth)?),
            "$or" => Filter::Or(parse_list(value, depth)?),
            "$not" => match value {
                Bson::Document(d) => Filter::Not(Box::new(parse_doc(d, depth + 1)?)),
                _ => return Err(DbError::QueryError("$not requires a document".into())),
            },
            k if k.starts_with('$') => {
                return Err(DbError::QueryError(format!("unknown top-level operator {k}")));
            }
            field => parse_field(field, value)?,
        };
        out = out.and(part);
    }
    Ok(out)
}

fn parse_list(value: &Bson, depth: usize) -> Result<Vec<Filter>, DbError> {
    let Bson::Array(items) = value else {
        return Err(DbError::QueryError("$and/$or require an array".into()));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_doc(d, depth + 1),
            _ => Err(DbError::QueryError("$and/$or items must be documents".into())),
        })
        .collect()
}

fn parse_field(field: &str, value: &Bson) -> Result<Filter, DbError> {
    match value {
        Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
            parse_operators(field, ops)
        }
        Bson::RegularExpression(re) => Ok(Filter::Regex {
            path: field.to_string(),
            pattern: re.pattern.as_str().to_string(),
            case_insensitive: re.options.as_str().contains('i'),
        }),
        v => Ok(Filter::eq(field, v.clone())),
    }
}

fn parse_operators(field: &str, ops: &BsonDocument) -> Result<Filter, DbError> {
    let path = field.to_string();
    let mut out = Filter::True;
    for (op, operand) in ops {
        let part = match op.as_str() {
            "$eq" => Filter::cmp(field, CmpOp::Eq, operand.clone()),
            "$ne" => Filter::cmp(field, CmpOp::Ne, operand.clone()),
            "$gt" => Filter::cmp(field, CmpOp::Gt, operand.clone()),
            "$gte" => Filter::cmp(field, CmpOp::Gte, operand.clone()),
            "$lt" => Filter::cmp(field, CmpOp::Lt, operand.clone()),
            "$lte" => Filter::cmp(field, CmpOp::Lte, operand.clone()),
            "$in" => Filter::In { path: path.clone(), values: operand_set(op, operand)? },
            "$nin" => Filter::Nin { path: path.clone(), values: operand_set(op, operand)? },
            "$exists" => match operand {
                Bson::Boolean(b) => Filter::Exists { path: path.clone(), exists: *b },
                _ => return Err(DbError::QueryError("$exists requires a boolean".into())),
            },
            "$regex" => match operand {
                Bson::String(p) => Filter::Regex {
                    path: path.clone(),
                    pattern: p.clone(),
                    case_insensitive: ops.get_str("$options").is_ok_and(|o| o.contains('i')),
                },
                Bson::RegularExpression(re) => Filter::Regex {
                    path: path.clone(),
                    pattern: re.pattern.as_str().to_string(),
                    case_insensitive: re.options.as_str().contains('i'),
                },
                _ => return Err(DbError::QueryError("$regex requires a string".into())),
            },
            "$options" => continue,
            "$not" => match operand {
                Bson::Document(inner) => Filter::Not(Box::new(parse_operators(field, inner)?)),
                _ => return Err(DbError::QueryError("$not requires an operator document".into())),
            },
            other => return Err(DbError::QueryError(format!("unknown operator {other}"))),
        };
        out = out.and(part);
    }
    Ok(out)
}

fn operand_set(op: &str, operand: &Bson) -> Result<Vec<Bson>, DbError> {
    match operand {
        Bson::Array(vals) => Ok(vals.iter().take(MAX_IN_SET).cloned().collect()),
        _ => Err(DbError::QueryError(format!("{op} requires an array"))),
    }
}
