//! Stepper behavior: cursor/ended monotonicity, masks, scale factors

mod common;

use common::{drain, uniform_jobs, Fixture};
use metasim_core_rs::models::AdmissionMask;
use metasim_core_rs::orchestrator::StepOutcome;
use metasim_core_rs::PolicyConfig;

#[test]
fn test_lone_job_turnaround_equals_run_time() {
    let mut fx = Fixture::new(&[(1, 5000, 10, 4)]);
    let id = fx.instance(8);

    drain(&mut fx.manager, id);

    let results = fx.manager.get_results(id);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].turnaround(), 10.0);
    assert_eq!(results[0].wait, 0.0);
    assert_eq!(results[0].to_line(), "1;4;4;10;10;0;0;0;10");
}

#[test]
fn test_extreme_submit_times_step_without_overflow() {
    let mut fx = Fixture::new(&[(1, -10, 5, 1), (2, i64::MAX, 5, 1)]);
    let id = fx.instance(4);

    assert_eq!(fx.manager.step(id), StepOutcome::Admitted);
    assert_eq!(fx.manager.step(id), StepOutcome::Admitted);
    drain(&mut fx.manager, id);

    let results = fx.manager.get_results(id);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].submit, 0.0);
    assert!(results[1].submit > 9.0e18);
}

#[test]
fn test_cursor_counts_consumed_positions() {
    let mut fx = Fixture::new(&uniform_jobs(3, 10, 5, 1));
    let id = fx.instance(4);

    assert_eq!(fx.manager.cursor(id), 0);
    for expected in 1..=3 {
        assert_eq!(fx.manager.step(id), StepOutcome::Admitted);
        assert_eq!(fx.manager.cursor(id), expected);
    }
    drain(&mut fx.manager, id);
    assert_eq!(fx.manager.cursor(id), 3);
}

#[test]
fn test_step_after_end_changes_nothing() {
    let mut fx = Fixture::new(&uniform_jobs(2, 1, 3, 1));
    let id = fx.instance(4);
    drain(&mut fx.manager, id);

    let results = fx.manager.get_results(id).to_vec();
    let mask = fx.manager.get_mask(id);
    for _ in 0..5 {
        assert_eq!(fx.manager.step(id), StepOutcome::Ended);
    }
    assert!(fx.manager.is_ended(id));
    assert_eq!(fx.manager.cursor(id), 2);
    assert_eq!(fx.manager.get_results(id), results.as_slice());
    assert_eq!(fx.manager.get_mask(id), mask);
}

#[test]
fn test_empty_trace_ends_on_first_step() {
    let mut fx = Fixture::new(&[]);
    let id = fx.instance(4);
    assert_eq!(fx.manager.step(id), StepOutcome::Ended);
    assert!(fx.manager.all_ended(&[id]));
}

#[test]
fn test_disabled_positions_cost_nothing() {
    let mut fx = Fixture::new(&uniform_jobs(4, 10, 100, 4));
    let id = fx.instance(4);
    fx.manager.set_mask(id, [(1, false), (2, false)].into_iter().collect::<AdmissionMask>());

    drain(&mut fx.manager, id);

    let ids: Vec<i64> = fx.manager.get_results(id).iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 4]);
    // job 4 waits only for job 1, the skipped jobs never held processors
    let last = &fx.manager.get_results(id)[1];
    assert_eq!(last.start, 100.0);
    assert_eq!(fx.manager.instance(id).stats().skipped, 2);
}

#[test]
fn test_disable_next_then_enable_next_restores_admission() {
    let mut fx = Fixture::new(&uniform_jobs(1, 1, 1, 1));
    let id = fx.instance(4);
    fx.manager.disable_next(id);
    fx.manager.enable_next(id);
    assert_eq!(fx.manager.step(id), StepOutcome::Admitted);
}

#[test]
fn test_oversized_job_is_consumed_not_admitted() {
    let mut fx = Fixture::new(&[(1, 0, 10, 64), (2, 5, 10, 2)]);
    let id = fx.instance(8);

    assert_eq!(fx.manager.step(id), StepOutcome::Rejected);
    assert_eq!(fx.manager.step(id), StepOutcome::Admitted);
    drain(&mut fx.manager, id);

    let results = fx.manager.get_results(id);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 2);
}

#[test]
fn test_completions_ordered_by_end_time() {
    let mut fx = Fixture::new(&[(1, 0, 50, 1), (2, 0, 10, 1), (3, 0, 30, 1)]);
    let id = fx.instance(4);
    drain(&mut fx.manager, id);

    let ids: Vec<i64> = fx.manager.get_results(id).iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
}

#[test]
fn test_fcfs_head_blocks_small_job() {
    // 8 procs: job 1 holds 6 until t=100, job 2 needs 4, job 3 needs 2
    let jobs = [(1, 0, 100, 6), (2, 1, 10, 4), (3, 2, 10, 2)];
    let mut fx = Fixture::with_policy(&jobs, PolicyConfig::Fcfs);
    let id = fx.instance(8);
    drain(&mut fx.manager, id);

    let third = fx.manager.get_results(id).iter().find(|r| r.id == 3).unwrap();
    assert_eq!(third.start, 100.0);
}

#[test]
fn test_backfill_lets_short_job_through() {
    let jobs = [(1, 0, 100, 6), (2, 1, 10, 4), (3, 2, 10, 2)];
    let mut fx = Fixture::with_policy(&jobs, PolicyConfig::EasyBackfill);
    let id = fx.instance(8);
    drain(&mut fx.manager, id);

    let third = fx.manager.get_results(id).iter().find(|r| r.id == 3).unwrap();
    assert_eq!(third.start, 2.0);
    let second = fx.manager.get_results(id).iter().find(|r| r.id == 2).unwrap();
    assert_eq!(second.start, 100.0);
}

#[test]
fn test_scale_factors_stretch_run_and_walltime() {
    let mut fx = Fixture::new(&[(1, 0, 10, 1)]);
    let id = fx.instance(4);
    fx.manager.set_scale_factors(id, 1.5, 2.0);
    drain(&mut fx.manager, id);

    let r = &fx.manager.get_results(id)[0];
    assert_eq!(r.run, 15.0);
    assert_eq!(r.walltime, 20.0);
    assert_eq!(r.turnaround(), 15.0);
}

#[test]
fn test_visible_lines_hide_the_rest_of_the_trace() {
    let mut fx = Fixture::new(&uniform_jobs(5, 1, 1, 1));
    let id = fx.instance(4);
    fx.manager.set_max_visible_lines(id, 2);
    drain(&mut fx.manager, id);

    assert_eq!(fx.manager.cursor(id), 2);
    assert_eq!(fx.manager.get_results(id).len(), 2);
}

#[test]
fn test_sim_times_shift_virtual_clock() {
    let mut fx = Fixture::new(&[(1, 1000, 10, 1)]);
    let id = fx.instance(4);
    fx.manager.set_sim_times(id, 1000, 500);
    drain(&mut fx.manager, id);

    let r = &fx.manager.get_results(id)[0];
    assert_eq!(r.submit, 500.0);
    assert_eq!(r.end, 510.0);
}

#[test]
fn test_results_grow_monotonically_mid_run() {
    let mut fx = Fixture::new(&uniform_jobs(6, 5, 3, 1));
    let id = fx.instance(2);

    let mut seen = 0;
    while !fx.manager.is_ended(id) {
        fx.manager.step(id);
        let now = fx.manager.get_results(id).len();
        assert!(now >= seen);
        seen = now;
    }
    assert_eq!(seen, 6);
}
