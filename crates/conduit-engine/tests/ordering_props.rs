use conduit_engine::prelude::*;
use conduit_test_utils::{driver, fixtures, handles_of, MemoryAdapter, TableMapper};
use proptest::prelude::*;

fn ids(placeholders: &PlaceholderSet) -> Vec<String> {
    placeholders
        .iter()
        .map(|p| p.external_id.to_string())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_points_convert_before_members(count in 2usize..12) {
        let graph = fixtures::chain(count);
        let outcome = driver()
            .run(&graph, &PlaceholderSet::new(), &TableMapper, &mut MemoryAdapter::new())
            .unwrap();

        let expected: Vec<String> = (0..count)
            .map(|i| format!("n{i}"))
            .chain((0..count - 1).map(|i| format!("e{i}")))
            .collect();
        prop_assert_eq!(ids(&outcome.placeholders), expected);
    }

    #[test]
    fn prop_same_document_same_outcome(count in 2usize..12) {
        let graph = fixtures::chain(count);
        let mut left = MemoryAdapter::new();
        let mut right = MemoryAdapter::new();
        let a = driver().run(&graph, &PlaceholderSet::new(), &TableMapper, &mut left).unwrap();
        let b = driver().run(&graph, &PlaceholderSet::new(), &TableMapper, &mut right).unwrap();

        prop_assert_eq!(ids(&a.placeholders), ids(&b.placeholders));
        prop_assert_eq!(a.summary.apply, b.summary.apply);
        prop_assert_eq!(a.report.full_log(), b.report.full_log());
    }

    #[test]
    fn prop_rerun_is_idempotent(count in 2usize..12) {
        let graph = fixtures::chain(count);
        let mut adapter = MemoryAdapter::new();
        let first = driver().run(&graph, &PlaceholderSet::new(), &TableMapper, &mut adapter).unwrap();
        let second = driver().run(&graph, &first.persisted, &TableMapper, &mut adapter).unwrap();

        prop_assert_eq!(second.summary.apply.created, 0);
        prop_assert_eq!(second.summary.apply.deleted, 0);
        prop_assert_eq!(second.summary.reused_handles, 2 * count - 1);
        prop_assert_eq!(adapter.len(), 2 * count - 1);
        for p in first.persisted.iter() {
            let id = p.external_id.as_str();
            prop_assert_eq!(handles_of(&second.persisted, id), handles_of(&first.persisted, id));
        }
    }

    #[test]
    fn prop_dropping_members_deletes_exactly_them(count in 2usize..10, keep in 0usize..10) {
        let keep = keep.min(count - 1);
        let full = fixtures::chain(count);
        let mut adapter = MemoryAdapter::new();
        let first = driver().run(&full, &PlaceholderSet::new(), &TableMapper, &mut adapter).unwrap();

        let mut graph = InterchangeGraph::new();
        let nodes: Vec<NodeId> = (0..count)
            .map(|i| fixtures::point(&mut graph, &format!("n{i}"), i as f64, 0.0, 0.0))
            .collect();
        let elements: Vec<NodeId> = (0..keep)
            .map(|i| fixtures::member(&mut graph, &format!("e{i}"), nodes[i], nodes[i + 1]))
            .collect();
        fixtures::model(&mut graph, &nodes, &elements);

        let second = driver().run(&graph, &first.persisted, &TableMapper, &mut adapter).unwrap();
        prop_assert_eq!(second.summary.apply.deleted, count - 1 - keep);
        prop_assert_eq!(adapter.count("member"), keep);
        prop_assert_eq!(adapter.count("point"), count);
    }
}
