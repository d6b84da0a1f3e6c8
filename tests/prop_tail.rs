mod common;

use cappedlite::document::RawDecoder;
use cappedlite::query::{CmpOp, CursorOptions, Filter, QueryDescriptor, compare_bson, eval_filter};
use cappedlite::tail::{TailOptions, TimeoutBudget, tail};
use cappedlite::types::{DocumentId, IdGenerator, ResumeToken};
use common::{End, Script, ScriptedStore, docs};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::time::{Duration, Instant};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_reopens_never_skip_or_repeat(
        n in 1u64..30,
        cuts in proptest::collection::vec(1usize..6, 0..8),
    ) {
        let all = docs(n);
        let mut scripts = Vec::new();
        let mut start = 0usize;
        for c in cuts {
            if start >= all.len() {
                break;
            }
            let end = (start + c).min(all.len());
            scripts.push(Script::records(&all[start..end], End::Dead));
            start = end;
        }
        scripts.push(Script::records(&all[start..], End::Idle));
        let store = ScriptedStore::capped(scripts);
        let q = QueryDescriptor::new(Filter::True, CursorOptions::tailing());
        let got: Vec<i64> = tail(store.clone(), "c", q, RawDecoder, &TailOptions::forever())
            .unwrap()
            .take(all.len())
            .map(|r| r.unwrap().get_i64("n").unwrap())
            .collect();
        let want: Vec<i64> = (1..=n as i64).collect();
        prop_assert_eq!(got, want);
        prop_assert_eq!(store.max_open(), 1);
        prop_assert_eq!(store.open_now(), 0);
    }

    #[test]
    fn prop_resume_filter_admits_exactly_later_ids(n in 1u64..40, k in 0u64..40) {
        let all = docs(n);
        let k = k.min(n - 1) as usize;
        let token = ResumeToken(all[k].get("_id").unwrap().clone());
        let f = QueryDescriptor::new(Filter::True, CursorOptions::tailing())
            .resume_after(&token)
            .effective_filter();
        for (i, d) in all.iter().enumerate() {
            prop_assert_eq!(eval_filter(d, &f), i > k);
        }
    }

    #[test]
    fn prop_generated_ids_strictly_increase(count in 2usize..200) {
        let mut ids = IdGenerator::new();
        let v: Vec<DocumentId> = (0..count).map(|_| ids.next_id()).collect();
        for w in v.windows(2) {
            prop_assert_eq!(compare_bson(&w[0].into(), &w[1].into()), Ordering::Less);
        }
    }

    #[test]
    fn prop_budget_never_grows(
        steps in proptest::collection::vec((0u64..50, any::<bool>()), 0..40),
    ) {
        let t0 = Instant::now();
        let mut b = TimeoutBudget::starting_at(Duration::from_millis(500), t0).unwrap();
        let mut now = t0;
        let mut last = b.remaining();
        for (ms, rebase) in steps {
            now += Duration::from_millis(ms);
            if rebase { b.rebase_at(now) } else { b.charge_at(now); }
            prop_assert!(b.remaining() <= last);
            last = b.remaining();
        }
    }
}

#[test]
fn resume_bound_is_a_strict_lower_bound() {
    let token = ResumeToken(DocumentId::from_parts(10, 5).into());
    let f = QueryDescriptor::default().resume_after(&token).effective_filter();
    assert!(f.has_constraint("_id", CmpOp::Gt, token.as_bson()));
}
