use bson::{Bson, doc};
use cappedlite::query::{CmpOp, Filter, compare_bson, eval_filter, parse_filter_json};
use cappedlite::types::DocumentId;
use std::cmp::Ordering;

#[test]
fn dotted_paths_reach_nested_documents() {
    let d = doc! {"o": {"p": "src/main.rs", "l": 10_i64}, "p": {"i": 4}};
    assert!(eval_filter(&d, &Filter::eq("o.p", "src/main.rs")));
    assert!(eval_filter(&d, &Filter::cmp("o.l", CmpOp::Gt, 9)));
    assert!(!eval_filter(&d, &Filter::eq("o.missing", 1)));
    let f = parse_filter_json(r#"{"p.i": {"$in": [1, 4]}, "o.f": {"$exists": false}}"#).unwrap();
    assert!(eval_filter(&d, &f));
}

#[test]
fn numbers_compare_across_widths() {
    assert_eq!(compare_bson(&Bson::Int32(3), &Bson::Int64(3)), Ordering::Equal);
    assert_eq!(compare_bson(&Bson::Double(2.5), &Bson::Int32(3)), Ordering::Less);
    assert!(eval_filter(&doc! {"n": 3_i64}, &Filter::eq("n", 3)));
}

#[test]
fn object_ids_order_by_insertion() {
    let a: Bson = DocumentId::from_parts(100, u64::MAX).into();
    let b: Bson = DocumentId::from_parts(101, 0).into();
    assert_eq!(compare_bson(&a, &b), Ordering::Less);
    assert!(eval_filter(&doc! {"_id": b.clone()}, &Filter::cmp("_id", CmpOp::Gt, a)));
}

#[test]
fn extended_json_object_ids_are_accepted() {
    let id = DocumentId::from_parts(1_700_000_000, 7);
    let json = format!(r#"{{"_id": {{"$gt": {{"$oid": "{}"}}}}}}"#, id.0.to_hex());
    let f = parse_filter_json(&json).unwrap();
    assert!(eval_filter(&doc! {"_id": DocumentId::from_parts(1_700_000_000, 8)}, &f));
    assert!(!eval_filter(&doc! {"_id": id}, &f));
}

#[test]
fn not_and_nin_negate() {
    let f = parse_filter_json(r#"{"s": {"$not": {"$regex": "^db"}}, "l": {"$nin": [4, 5]}}"#)
        .unwrap();
    assert!(eval_filter(&doc! {"s": "api", "l": 1}, &f));
    assert!(!eval_filter(&doc! {"s": "db-writer", "l": 1}, &f));
    assert!(!eval_filter(&doc! {"s": "api", "l": 5}, &f));
}
