// Refetch decision controller tests: pure function of the two contexts and
// the elapsed-time guard

use std::collections::BTreeSet;

use wattline::fetch::{FetchContext, FetchDecision, should_fetch};
use wattline::models::{AggregationLevel, Phase};

fn devices(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn context(at_ms: i64) -> FetchContext {
    FetchContext {
        start_ms: 0,
        end_ms: 3_600_000,
        level: None,
        device_ids: devices(&["meter-a", "meter-b"]),
        with_energy: false,
        energy_phase: Phase::All,
        at_ms,
    }
}

#[test]
fn no_previous_context_fetches_everything() {
    let current = context(5_000);
    assert_eq!(
        should_fetch(&current, None, 10),
        FetchDecision::FetchPrimaryAndSecondary
    );
}

#[test]
fn identical_parameters_inside_guard_skip() {
    let previous = context(0);
    let current = context(5_000);
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::Skip
    );
}

#[test]
fn expired_guard_forces_full_fetch() {
    let previous = context(0);
    let current = context(11_000);
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::FetchPrimaryAndSecondary
    );
}

#[test]
fn guard_boundary_is_inclusive() {
    let previous = context(0);
    let current = context(10_000);
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::FetchPrimaryAndSecondary
    );
}

#[test]
fn secondary_toggle_inside_guard_fetches_overlay_only() {
    let previous = context(0);
    let mut current = context(5_000);
    current.with_energy = true;
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::FetchSecondaryOnly
    );
}

#[test]
fn phase_change_inside_guard_fetches_overlay_only() {
    let mut previous = context(0);
    previous.with_energy = true;
    let mut current = context(5_000);
    current.with_energy = true;
    current.energy_phase = Phase::B;
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::FetchSecondaryOnly
    );
}

#[test]
fn changed_time_range_overrides_the_guard() {
    let previous = context(0);
    let mut current = context(2_000);
    current.end_ms = 7_200_000;
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::FetchPrimaryAndSecondary
    );
}

#[test]
fn changed_device_set_is_a_primary_change() {
    let previous = context(0);
    let mut current = context(2_000);
    current.device_ids = devices(&["meter-a"]);
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::FetchPrimaryAndSecondary
    );
}

#[test]
fn changed_level_is_a_primary_change() {
    let previous = context(0);
    let mut current = context(2_000);
    current.level = Some(AggregationLevel::Min5);
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::FetchPrimaryAndSecondary
    );
}

#[test]
fn primary_change_wins_over_secondary_toggle() {
    let previous = context(0);
    let mut current = context(2_000);
    current.start_ms = 1_000;
    current.with_energy = true;
    assert_eq!(
        should_fetch(&current, Some(&previous), 10),
        FetchDecision::FetchPrimaryAndSecondary
    );
}
