//! Capability index construction, hierarchical topic lookup and the
//! instance order shared by every resolver.


use std::cmp::Ordering;
use std::sync::Arc;

use proptest::prelude::*;

use capability_router::scheduler::{CapabilityIndex, JobProperties, QueuePolicy};
use capability_router::topology::{Instance, InstanceComparator};
use test_harness::{member, snapshot_for, view};

fn ids(instances: &[Arc<Instance>]) -> Vec<&str> {
    instances.iter().map(|i| i.id.as_str()).collect()
}

// =============================================================================
// Hierarchical lookup
// =============================================================================

#[test]
fn test_deep_category_matches_any_depth_below_prefix() {
    let cluster = view("a", vec![member("a", "g1", true, "a/b/**")]);
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(ids(&index.potential_targets("a/b/c")), vec!["a"]);
    assert_eq!(ids(&index.potential_targets("a/b/c/d")), vec!["a"]);
    assert_eq!(ids(&index.potential_targets("a/b/c/d/e")), vec!["a"]);
    // The prefix itself is not below the prefix
    assert!(index.potential_targets("a/b").is_empty());
}

#[test]
fn test_single_category_matches_direct_children_only() {
    let cluster = view("a", vec![member("a", "g1", true, "a/b/*")]);
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(ids(&index.potential_targets("a/b/c")), vec!["a"]);
    assert!(index.potential_targets("a/b/c/d").is_empty());
    assert!(index.potential_targets("a/b").is_empty());
}

#[test]
fn test_prefix_reachable_through_exact_or_parent_category() {
    let cluster = view(
        "x",
        vec![
            member("x", "g1", true, "a/b/**"),
            member("y", "g1", false, "a/b"),
            member("z", "g1", false, "a/*"),
        ],
    );
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(ids(&index.potential_targets("a/b")), vec!["y", "z"]);
}

#[test]
fn test_lookup_merges_all_levels_without_duplicates() {
    let cluster = view(
        "n1",
        vec![
            member("n1", "g1", true, "a/b/c,a/b/*,a/**"),
            member("n2", "g1", false, "a/b/**"),
            member("n3", "g2", true, "a/b/c"),
        ],
    );
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(ids(&index.potential_targets("a/b/c")), vec!["n1", "n2", "n3"]);
    assert_eq!(ids(&index.potential_targets("a/x")), vec!["n1"]);
}

#[test]
fn test_topic_without_slash_matches_exact_only() {
    let cluster = view(
        "a",
        vec![
            member("a", "g1", true, "report"),
            member("b", "g1", false, "report/*,report/**"),
        ],
    );
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(ids(&index.potential_targets("report")), vec!["a"]);
}

#[test]
fn test_leading_slash_never_forms_a_category() {
    let cluster = view("a", vec![member("a", "g1", true, "/*,/**")]);
    let index = CapabilityIndex::build(cluster.as_ref());

    assert!(index.potential_targets("/jobs").is_empty());
    assert!(index.potential_targets("/jobs/x").is_empty());
}

// =============================================================================
// Index construction
// =============================================================================

#[test]
fn test_malformed_announcements_are_tolerated() {
    let cluster = view(
        "a",
        vec![
            member("a", "g1", true, " jobs/a , ,,jobs/b/*,"),
            member("b", "g1", false, ","),
            member("c", "g1", false, ""),
            Instance::new("d", "g1"),
        ],
    );
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(index.pattern_count(), 2);
    assert_eq!(ids(index.candidates("jobs/a")), vec!["a"]);
    assert_eq!(ids(index.candidates("jobs/b/*")), vec!["a"]);
    assert!(index.candidates("").is_empty());
    assert_eq!(ids(&index.potential_targets("jobs/b/run")), vec!["a"]);
}

#[test]
fn test_silent_instances_remain_resolvable_by_id() {
    let cluster = view(
        "a",
        vec![member("a", "g1", true, "jobs/*"), Instance::new("b", "g2")],
    );
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(index.instance_count(), 2);
    assert_eq!(index.instance("b").map(|i| i.cluster_id.as_str()), Some("g2"));
    assert!(index.instance("missing").is_none());
}

#[test]
fn test_repeated_token_indexes_instance_once() {
    let cluster = view("a", vec![member("a", "g1", true, "jobs/*, jobs/*,jobs/*")]);
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(ids(index.candidates("jobs/*")), vec!["a"]);
}

#[test]
fn test_candidate_lists_follow_comparator_order() {
    let cluster = view(
        "m",
        vec![
            member("z", "remote", true, "t"),
            member("b", "local", false, "t"),
            member("m", "local", true, "t"),
            member("a", "remote", false, "t"),
            member("c", "local", false, "t"),
        ],
    );
    let index = CapabilityIndex::build(cluster.as_ref());

    assert_eq!(ids(index.candidates("t")), vec!["m", "b", "c", "a", "z"]);
    assert_eq!(index.comparator().local_cluster_id(), "local");
}

// =============================================================================
// Cross-resolver agreement for ordered queues
// =============================================================================

/// Members of two groups announcing the same topic, where group `g2`'s leader
/// does not have the smallest id.
fn mixed_leadership() -> Vec<Instance> {
    vec![
        member("g1-leader", "g1", true, "orders/*"),
        member("g2-a", "g2", false, "orders/*"),
        member("g2-z", "g2", true, "orders/*"),
    ]
}

fn ordered_target(local: &str, members: Vec<Instance>, created_on: &str) -> Option<String> {
    let snapshot = snapshot_for(view(local, members));
    snapshot.detect_target(
        "orders/process",
        &JobProperties::new().with_created_instance(created_on),
        &QueuePolicy::ordered(),
    )
}

#[test]
fn test_resolvers_in_the_same_group_agree_on_ordered_target() {
    let from_a = ordered_target("g2-a", mixed_leadership(), "g2-a");
    let from_z = ordered_target("g2-z", mixed_leadership(), "g2-a");
    assert_eq!(from_a.as_deref(), Some("g2-z"));
    assert_eq!(from_a, from_z);
}

#[test]
fn test_remote_resolver_orders_other_groups_by_id() {
    // Leader preference only applies inside the resolver's own group, so a
    // resolver in g1 picks the lowest id of g2 instead of g2's leader.
    let remote = ordered_target("g1-leader", mixed_leadership(), "g2-a");
    let local = ordered_target("g2-z", mixed_leadership(), "g2-a");
    assert_eq!(remote.as_deref(), Some("g2-a"));
    assert_eq!(local.as_deref(), Some("g2-z"));
}

#[test]
fn test_all_resolvers_agree_when_creator_group_has_no_leader_candidate() {
    let members = || {
        vec![
            member("g1-leader", "g1", true, "orders/*"),
            member("g2-leader", "g2", true, ""),
            member("g2-b", "g2", false, "orders/*"),
            member("g2-a", "g2", false, "orders/*"),
        ]
    };
    let targets: Vec<_> = ["g1-leader", "g2-leader", "g2-b", "g2-a"]
        .into_iter()
        .map(|local| ordered_target(local, members(), "g2-b"))
        .collect();

    assert!(targets.iter().all(|t| t.as_deref() == Some("g2-a")));
}

// =============================================================================
// Properties
// =============================================================================

/// (cluster-group, leader flag, announces the topic) per member; ids are `n<index>`.
fn members_strategy() -> impl Strategy<Value = Vec<(u8, bool, bool)>> {
    prop::collection::vec((0u8..3, any::<bool>(), any::<bool>()), 1..8)
}

/// At most one leader per group: the first member flagged as leader wins.
fn build_members(spec: &[(u8, bool, bool)]) -> Vec<Instance> {
    let mut has_leader = [false; 3];
    spec.iter()
        .enumerate()
        .map(|(i, &(group, leader, announces))| {
            let leader = leader && !has_leader[group as usize];
            if leader {
                has_leader[group as usize] = true;
            }
            member(
                &format!("n{i}"),
                &format!("g{group}"),
                leader,
                if announces { "orders/*" } else { "" },
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_comparator_is_antisymmetric_and_transitive(
        spec in members_strategy(),
        local_group in 0u8..3,
    ) {
        let members = build_members(&spec);
        let cmp = InstanceComparator::new(format!("g{local_group}"));

        for a in &members {
            prop_assert_eq!(cmp.compare(a, a), Ordering::Equal);
            for b in &members {
                prop_assert_eq!(cmp.compare(a, b), cmp.compare(b, a).reverse());
                for c in &members {
                    if cmp.compare(a, b).is_le() && cmp.compare(b, c).is_le() {
                        prop_assert!(cmp.compare(a, c).is_le());
                    }
                }
            }
        }
    }

    #[test]
    fn prop_index_ignores_member_order(
        (members, shuffled) in members_strategy()
            .prop_map(|spec| build_members(&spec))
            .prop_flat_map(|members| (Just(members.clone()), Just(members).prop_shuffle())),
    ) {
        let local = members[0].id.clone();
        let first = view(&local, members);
        let second = view(&local, shuffled);

        let rebuilt = CapabilityIndex::build(first.as_ref()).patterns();
        prop_assert_eq!(CapabilityIndex::build(first.as_ref()).patterns(), rebuilt.clone());
        prop_assert_eq!(CapabilityIndex::build(second.as_ref()).patterns(), rebuilt);
    }

    #[test]
    fn prop_resolvers_of_one_group_agree_on_ordered_target(
        spec in members_strategy(),
        creator in any::<prop::sample::Index>(),
    ) {
        let members = build_members(&spec);
        let created_on = members[creator.index(members.len())].id.clone();

        for group in 0u8..3 {
            let cluster_id = format!("g{group}");
            let targets: Vec<_> = members
                .iter()
                .filter(|m| m.cluster_id == cluster_id)
                .map(|m| ordered_target(&m.id, members.clone(), &created_on))
                .collect();
            if let Some(first) = targets.first() {
                prop_assert!(targets.iter().all(|t| t == first));
            }
        }
    }

    #[test]
    fn prop_round_robin_cycles_through_every_target(spec in members_strategy()) {
        let members = build_members(&spec);
        let local = members[0].id.clone();
        let snapshot = snapshot_for(view(&local, members));
        let props = JobProperties::new().with_created_instance("not-a-member");

        let candidates = snapshot.potential_targets("orders/process");
        let picked: Vec<String> = (0..candidates.len() * 2)
            .filter_map(|_| snapshot.detect_target("orders/process", &props, &QueuePolicy::unordered()))
            .collect();

        let expected: Vec<String> = candidates.iter().chain(candidates.iter()).cloned().collect();
        prop_assert_eq!(picked, expected);
    }
}
