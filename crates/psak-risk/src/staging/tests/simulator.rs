use super::common::*;
use crate::staging::domain::StageType;
use crate::staging::simulate;

#[test]
fn simulation_tallies_stages_and_rule_hits() {
    let transactions = vec![
        transaction("a", 0),
        transaction("b", 45),
        transaction("c", 120),
        transaction("d", 31),
    ];

    let summary = simulate(&dpd_rules(), &transactions);

    assert_eq!(summary.total, 4);
    let counts: Vec<(StageType, usize)> = summary
        .distribution
        .iter()
        .map(|entry| (entry.stage, entry.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            (StageType::Stage1, 1),
            (StageType::Stage2, 2),
            (StageType::Stage3, 1)
        ]
    );
    assert!((summary.distribution[1].share - 0.5).abs() < 1e-12);

    let hits: Vec<(&str, usize)> = summary
        .rule_hits
        .iter()
        .map(|hit| (hit.rule_id.as_str(), hit.hits))
        .collect();
    assert_eq!(hits, vec![("dpd-90", 1), ("dpd-30", 2), ("performing", 1)]);
    assert!(summary.unassigned.is_empty());
    assert_eq!(summary.outcomes[2].matched_rule_id.as_deref(), Some("dpd-90"));
}

#[test]
fn empty_batch_has_zero_shares() {
    let summary = simulate(&dpd_rules(), &[]);

    assert_eq!(summary.total, 0);
    assert!(summary.distribution.iter().all(|entry| entry.share == 0.0));
    assert_eq!(summary.rule_hits.len(), 3);
}

#[test]
fn inactive_rules_are_excluded_from_hit_table() {
    let mut rules = dpd_rules();
    rules[1].is_active = false;

    let summary = simulate(&rules, &[transaction("x", 45)]);

    assert!(summary.rule_hits.iter().all(|hit| hit.rule_id != "dpd-30"));
    assert_eq!(summary.outcomes[0].stage, Some(StageType::Stage1));
}
