//! Tests for learning rate schedulers

use super::*;
use crate::optim::SGD;
use approx::assert_abs_diff_eq;

fn run(mut scheduler: impl LRScheduler, steps: usize) -> Vec<f32> {
    let mut lrs = Vec::with_capacity(steps);
    for _ in 0..steps {
        lrs.push(scheduler.get_lr());
        scheduler.step();
    }
    lrs
}

#[test]
fn test_sched_cos_endpoints() {
    assert_abs_diff_eq!(sched_cos(1.0, 0.0, 0.0), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(sched_cos(1.0, 0.0, 0.5), 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(sched_cos(1.0, 0.0, 1.0), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(sched_cos(1.0, 0.0, 2.0), 0.0, epsilon = 1e-6);
}

#[test]
fn test_one_cycle_shape() {
    let lrs = run(OneCycleLR::new(1.0, 100), 101);
    assert_abs_diff_eq!(lrs[0], 1.0 / 25.0, epsilon = 1e-6);
    assert_abs_diff_eq!(lrs[25], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(lrs[100], 1e-5, epsilon = 1e-7);

    // increasing during warm-up, decreasing afterwards
    assert!(lrs[..25].windows(2).all(|w| w[1] >= w[0]));
    assert!(lrs[25..].windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_one_cycle_custom_pct() {
    let lrs = run(OneCycleLR::new(0.1, 10).with_pct_start(0.5).with_divs(10.0, 100.0), 11);
    assert_abs_diff_eq!(lrs[0], 0.01, epsilon = 1e-7);
    assert_abs_diff_eq!(lrs[5], 0.1, epsilon = 1e-7);
    assert_abs_diff_eq!(lrs[10], 0.001, epsilon = 1e-7);
}

#[test]
fn test_flat_cos_shape() {
    let lrs = run(FlatCosLR::new(0.5, 100), 101);
    assert!(lrs[..75].iter().all(|lr| (*lr - 0.5).abs() < 1e-7));
    assert_abs_diff_eq!(lrs[100], 0.0, epsilon = 1e-7);
    assert!(lrs[75..].windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_sgdr_restarts() {
    // 3 cycles of 1, 2 and 4 epochs, 10 steps per epoch
    let scheduler = SgdrLR::new(1.0, 10, 3);
    assert_eq!(scheduler.total_epochs(), 7);
    let lrs = run(scheduler, 70);

    assert_abs_diff_eq!(lrs[0], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(lrs[10], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(lrs[30], 1.0, epsilon = 1e-6);
    assert!(lrs[9] < 0.1);
    assert_abs_diff_eq!(lrs[20], 0.5, epsilon = 1e-6);
}

#[test]
fn test_sgdr_epochs_for() {
    assert_eq!(SgdrLR::epochs_for(1, 1, 2), 1);
    assert_eq!(SgdrLR::epochs_for(4, 1, 2), 15);
    assert_eq!(SgdrLR::epochs_for(3, 2, 1), 6);
}

#[test]
fn test_exponential_sweep() {
    let lrs = run(ExponentialLR::new(1e-7, 10.0, 100), 101);
    assert_abs_diff_eq!(lrs[0], 1e-7, epsilon = 1e-12);
    assert_abs_diff_eq!(lrs[100], 10.0, epsilon = 1e-3);
    assert!(lrs.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_apply_sets_optimizer_lr() {
    let mut opt = SGD::new(0.0, 0.0);
    let scheduler = FlatCosLR::new(0.3, 10);
    scheduler.apply(&mut opt);
    assert_abs_diff_eq!(crate::optim::Optimizer::lr(&opt), 0.3, epsilon = 1e-7);
}
