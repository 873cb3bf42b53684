//! Cross-instance routing: exclusivity, cursor alignment, skip handling and
//! agreement between predicted and simulated outcomes

mod common;

use common::{drain, uniform_jobs, Fixture, Job};
use metasim_core_rs::orchestrator::{
    InstanceId, PendingJob, Router, RoutingDecision, RoutingGroup, RoutingPolicy,
};
use metasim_core_rs::load_job_data;

fn route_all(fx: &mut Fixture, router: &mut Router) -> Vec<Option<InstanceId>> {
    let jobs = load_job_data(fx.trace_dir(), "trace.swf").unwrap();
    router.run(&mut fx.manager, &jobs, |_, _| {}).assignments
}

#[test]
fn test_each_job_admitted_by_exactly_one_candidate() {
    let mut fx = Fixture::new(&uniform_jobs(12, 3, 10, 2));
    let ids = vec![fx.instance(4), fx.instance(4), fx.instance(4)];
    let mut router = Router::new(
        RoutingGroup::new(ids.clone()),
        RoutingPolicy::Probabilistic {
            weights: vec![1.0, 1.0, 1.0],
        },
        11,
    )
    .unwrap();

    let assignments = route_all(&mut fx, &mut router);

    for (index, target) in assignments.iter().enumerate() {
        let target = target.unwrap();
        for &id in &ids {
            assert_eq!(fx.manager.get_mask(id).is_enabled(index), id == target);
        }
    }
    let total: usize = ids.iter().map(|&id| fx.manager.get_results(id).len()).sum();
    assert_eq!(total, 12);
    assert!(fx.manager.all_ended(&ids));
}

#[test]
fn test_cursors_stay_aligned_while_routing() {
    let mut fx = Fixture::new(&uniform_jobs(5, 1, 4, 1));
    let ids = vec![fx.instance(2), fx.instance(2)];
    let mut router =
        Router::new(RoutingGroup::new(ids.clone()), RoutingPolicy::PredictedTurnaround, 3).unwrap();
    let jobs = load_job_data(fx.trace_dir(), "trace.swf").unwrap();

    for index in 0..jobs.len() {
        let job = PendingJob {
            index,
            id: jobs.ids[index],
            procs: jobs.procs[index],
        };
        router.route(&mut fx.manager, &job);
        assert_eq!(fx.manager.cursor(ids[0]), index + 1);
        assert_eq!(fx.manager.cursor(ids[1]), index + 1);
    }
}

#[test]
fn test_infeasible_job_skipped_everywhere() {
    let mut fx = Fixture::new(&[(1, 0, 10, 2), (2, 5, 10, 64), (3, 9, 10, 2)]);
    let ids = vec![fx.instance(8), fx.instance(8)];
    let mut router =
        Router::new(RoutingGroup::new(ids.clone()), RoutingPolicy::PredictedTurnaround, 5).unwrap();

    assert!(fx.manager.predict_turnaround(&ids, 2, 64).is_empty());

    let mut decisions = Vec::new();
    let jobs = load_job_data(fx.trace_dir(), "trace.swf").unwrap();
    let report = router.run(&mut fx.manager, &jobs, |job, decision| {
        decisions.push((job.index, decision.clone()));
    });

    assert_eq!(report.skipped, 1);
    assert_eq!(decisions[1], (1, RoutingDecision::Skipped));
    for &id in &ids {
        assert!(!fx.manager.get_mask(id).is_enabled(1));
        assert_eq!(fx.manager.instance(id).stats().rejected, 0);
        assert!(fx.manager.get_results(id).iter().all(|r| r.id != 2));
    }
}

#[test]
fn test_prediction_agrees_with_direct_simulation() {
    // Two equal clusters, three jobs. For every routing step compare the
    // predicted turnaround with a separate full simulation of each choice.
    let jobs: Vec<Job> = vec![(1, 0, 50, 4), (2, 10, 30, 4), (3, 20, 10, 2)];
    let mut fx = Fixture::new(&jobs);
    let ids = vec![fx.instance(4), fx.instance(4)];
    let mut router =
        Router::new(RoutingGroup::new(ids.clone()), RoutingPolicy::PredictedTurnaround, 9).unwrap();

    let mut routed: Vec<InstanceId> = Vec::new();
    for (index, &(job_id, _, _, procs)) in jobs.iter().enumerate() {
        let decision = router.route(
            &mut fx.manager,
            &PendingJob {
                index,
                id: job_id,
                procs,
            },
        );
        let RoutingDecision::Routed {
            target,
            predictions,
        } = decision
        else {
            panic!("job {job_id} should be feasible");
        };

        for (&candidate, &predicted) in &predictions {
            let choice = ids.iter().position(|&x| x == candidate).unwrap();
            let simulated = simulate_choice(&jobs, &routed, index, choice);
            assert_eq!(predicted, simulated, "job {job_id} on {candidate}");
        }
        let best = predictions.values().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(predictions[&target], best);
        routed.push(target);
    }
}

/// Turnaround of job `index` when it goes to cluster `choice` and earlier
/// jobs follow `routed`, obtained by simulating that cluster to completion
fn simulate_choice(jobs: &[Job], routed: &[InstanceId], index: usize, choice: usize) -> f64 {
    let mut fx = Fixture::new(&jobs[..=index]);
    let mine = fx.instance(4);
    for (i, owner) in routed.iter().enumerate() {
        fx.manager.set_admission_mask(mine, i, owner.index() == choice);
    }
    drain(&mut fx.manager, mine);
    fx.manager
        .get_results(mine)
        .iter()
        .find(|r| r.id == jobs[index].0)
        .map(|r| r.turnaround())
        .unwrap()
}

#[test]
fn test_ties_spread_load_across_seeds() {
    // Jobs far apart never queue, so both clusters always tie
    let jobs = uniform_jobs(40, 1000, 10, 1);
    let mut first_cluster_share = 0;
    for seed in 1..=5u64 {
        let mut fx = Fixture::new(&jobs);
        let ids = vec![fx.instance(2), fx.instance(2)];
        let mut router =
            Router::new(RoutingGroup::new(ids.clone()), RoutingPolicy::PredictedTurnaround, seed)
                .unwrap();
        let assignments = route_all(&mut fx, &mut router);
        first_cluster_share += assignments.iter().filter(|a| **a == Some(ids[0])).count();
    }
    // 200 fair coin flips: far inside [60, 140]
    assert!((60..=140).contains(&first_cluster_share), "share {first_cluster_share}");
}

#[test]
fn test_first_feasible_falls_through_to_bigger_cluster() {
    let mut fx = Fixture::new(&[(1, 0, 10, 2), (2, 1, 10, 6)]);
    let small = fx.instance(4);
    let big = fx.instance(8);
    let mut router =
        Router::new(RoutingGroup::new(vec![small, big]), RoutingPolicy::FirstFeasible, 1).unwrap();

    let assignments = route_all(&mut fx, &mut router);
    assert_eq!(assignments, vec![Some(small), Some(big)]);
}

#[test]
fn test_zero_weight_candidate_never_chosen() {
    let mut fx = Fixture::new(&uniform_jobs(20, 5, 3, 1));
    let a = fx.instance(4);
    let b = fx.instance(4);
    let mut router = Router::new(
        RoutingGroup::new(vec![a, b]),
        RoutingPolicy::Probabilistic {
            weights: vec![0.0, 1.0],
        },
        42,
    )
    .unwrap();

    let assignments = route_all(&mut fx, &mut router);
    assert!(assignments.iter().all(|t| *t == Some(b)));
    assert!(fx.manager.get_results(a).is_empty());
}

#[test]
fn test_observer_sees_full_workload() {
    let mut fx = Fixture::new(&uniform_jobs(6, 2, 5, 1));
    let a = fx.instance(2);
    let b = fx.instance(2);
    let reference = fx.instance(4);
    let group = RoutingGroup::new(vec![a, b]).with_observers(vec![reference]);
    let mut router = Router::new(group, RoutingPolicy::FirstFeasible, 1).unwrap();

    route_all(&mut fx, &mut router);

    assert_eq!(fx.manager.get_results(reference).len(), 6);
    assert_eq!(
        fx.manager.get_results(a).len() + fx.manager.get_results(b).len(),
        6
    );
}

#[test]
fn test_routing_requires_a_candidate() {
    assert!(Router::new(RoutingGroup::default(), RoutingPolicy::FirstFeasible, 1).is_err());
}
