use std::sync::{Arc, Barrier};
use std::thread;

use queryplan::context::{GlobalPlannerContext, PlannerContext};
use queryplan::settings::PlannerSettings;
use queryplan::tree::QueryTreeNodeRef;
use queryplan::{collect_sets, PreparedSet};
use queryplan_data::{Value, ValueType};

mod common;

use common::*;

const THREADS: usize = 8;

/// Runs `collect_sets` on `THREADS` separately-built copies of the tree made by `make_tree`, all
/// sharing one registry, and returns the set each thread finds registered afterwards.
fn collect_concurrently<F>(
    global: &Arc<GlobalPlannerContext>,
    make_tree: F,
) -> Vec<Arc<PreparedSet>>
where
    F: Fn() -> (QueryTreeNodeRef, QueryTreeNodeRef) + Sync,
{
    let settings = Arc::new(PlannerSettings::default());
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let ctx = PlannerContext::new(Arc::clone(global), Arc::clone(&settings));
                let (root, rhs) = make_tree();
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    collect_sets(&root, &ctx).unwrap();
                    let entry = ctx
                        .global_planner_context()
                        .get_set_or_none(&GlobalPlannerContext::set_key(&rhs))
                        .unwrap();
                    Arc::clone(entry.set())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn constant_set_built_once() {
    queryplan_tracing::init_test_logging();
    let global = Arc::new(GlobalPlannerContext::new());

    let sets = collect_concurrently(&global, || {
        let rhs = int_list(&(0..1000).collect::<Vec<_>>());
        (in_fn("in", int_column("db.t", "a"), rhs.clone()), rhs)
    });

    assert_eq!(global.num_sets_built(), 1);
    assert_eq!(global.len(), 1);
    assert!(sets.iter().all(|set| Arc::ptr_eq(set, &sets[0])));
    assert_eq!(sets[0].len(), Some(1000));
}

#[test]
fn pending_set_registered_once_and_filled_for_all() {
    queryplan_tracing::init_test_logging();
    let global = Arc::new(GlobalPlannerContext::new());

    let sets = collect_concurrently(&global, || {
        let rhs = select(vec![int_column("db.u", "x")], memory_table("db.u"), None);
        (in_fn("in", int_column("db.t", "a"), rhs.clone()), rhs)
    });

    assert_eq!(global.num_sets_built(), 1);
    let links = global.subquery_nodes_for_sets();
    assert_eq!(links.len(), 1);
    assert!(sets.iter().all(|set| Arc::ptr_eq(set, &links[0].set)));
    assert!(sets.iter().all(|set| !set.is_ready()));

    links[0]
        .set
        .fill(vec![ValueType::Int], vec![vec![Value::Int(42)]])
        .unwrap();
    assert!(sets
        .iter()
        .all(|set| set.contains(&Value::Int(42)).unwrap()));
}
