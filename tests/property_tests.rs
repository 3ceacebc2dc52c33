#![allow(missing_docs)]

use adjoin::check::check_adjoint;
use adjoin::tree::reference;
use adjoin::{
    build, build_downstream_tree, build_upstream_tree, trace, trace_linear, AdjointOptions,
    Direction, Segment, SegmentTable, DEFAULT_CUTOFF, OUTLET,
};
use proptest::prelude::*;

/// Random forests: segment `i` drains into an earlier segment or the outlet,
/// so the generated network never contains a cycle.
fn arb_forest() -> impl Strategy<Value = SegmentTable> {
    prop::collection::vec((any::<prop::sample::Index>(), 1u32..=4, any::<bool>()), 1..60)
        .prop_map(|rows| {
            let segments = rows
                .iter()
                .enumerate()
                .map(|(i, (target, order, outlet))| {
                    let id = (i as i64 + 1) * 10;
                    let next_down = if i == 0 || *outlet {
                        OUTLET
                    } else {
                        (target.index(i) as i64 + 1) * 10
                    };
                    Segment::new(id, next_down, Some(*order))
                })
                .rev()
                .collect();
            SegmentTable::from_segments(segments).unwrap()
        })
}

proptest! {
    #[test]
    fn prop_grouped_and_reference_builders_agree(table in arb_forest(), order in 0u32..=4) {
        let order = (order != 0).then_some(order);
        prop_assert_eq!(
            build_upstream_tree(&table, order).unwrap(),
            reference::build_upstream_tree(&table, order).unwrap()
        );
        prop_assert_eq!(
            build_downstream_tree(&table, order).unwrap(),
            reference::build_downstream_tree(&table, order).unwrap()
        );
    }

    #[test]
    fn prop_upstream_keys_list_exactly_their_inflows(table in arb_forest()) {
        let up = build_upstream_tree(&table, None).unwrap();
        prop_assert_eq!(up.len(), table.len());
        for segment in table.iter() {
            let expected: Vec<i64> = table
                .iter()
                .filter(|s| s.next_down == segment.id)
                .map(|s| s.id)
                .collect();
            prop_assert_eq!(up.get(segment.id).unwrap().ids(), expected.as_slice());
        }
    }

    #[test]
    fn prop_linear_and_breadth_first_agree_on_filtered_trees(
        table in arb_forest(),
        order in 1u32..=4,
    ) {
        for tree in [
            build_upstream_tree(&table, Some(order)).unwrap(),
            build_downstream_tree(&table, Some(order)).unwrap(),
        ] {
            prop_assert!(tree.is_single_valued());
            for &id in tree.keys() {
                let walked = trace(&tree, id, DEFAULT_CUTOFF);
                prop_assert!(!walked.is_truncated());
                prop_assert_eq!(walked.ids, trace_linear(&tree, id).unwrap());
            }
        }
    }

    #[test]
    fn prop_built_dictionaries_pass_the_checker(
        table in arb_forest(),
        order in 0u32..=4,
        upstream in any::<bool>(),
    ) {
        let direction = if upstream { Direction::Upstream } else { Direction::Downstream };
        let mut opts = AdjointOptions::new(direction);
        opts.order = order;
        let built = build(&table, &opts).unwrap();
        prop_assert_eq!(built.map.len(), table.len());
        let report = check_adjoint(&table, &built.map, direction, opts.order_filter());
        prop_assert!(report.success, "{:?}", report.findings);
    }
}
