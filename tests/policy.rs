mod common;

use abduce::oracle::CtStatus;
use common::{config_with_literals, insecure, scripted_context, secure, ScriptedOracle};

const GT: &str = "(0x00000007 <s @[0x080e3f4c,4])";
const EQ: &str = "(@[0x080e3f4c,4] = 0x00000007)";
const LEQ: &str = "((@[0x080e3f4c,4] <s 0x00000007) | (@[0x080e3f4c,4] = 0x00000007))";

/// A scripted constant-time oracle around a branch on the word at 0x080e3f4c against
/// the pivot 7: the program is secure exactly under the assumptions which settle the
/// branch as modelled by `GT`, `EQ`, and the merged `LEQ`, and the complement of a
/// policy set leaks once both the greater and the equal side are excluded.
fn branch_oracle() -> ScriptedOracle {
    let mut oracle = ScriptedOracle::default();
    oracle.ct = Box::new(|assumptions: &[String]| {
        if assumptions.len() == 1 && [GT, EQ, LEQ].contains(&assumptions[0].as_str()) {
            return secure();
        }
        if !assumptions.is_empty() && assumptions.iter().all(|a| a.starts_with("!(")) {
            let bodies: Vec<&str> = assumptions
                .iter()
                .filter_map(|a| a.strip_prefix("!(").and_then(|r| r.strip_suffix(')')))
                .collect();
            if bodies.iter().all(|b| *b == GT || *b == EQ) {
                let covers_greater = bodies.contains(&GT);
                let covers_equal = bodies.contains(&EQ);
                if covers_greater && covers_equal {
                    return insecure();
                }
                return secure();
            }
            return insecure();
        }
        insecure()
    });
    oracle
}

fn branch_config(dir: &tempfile::TempDir) -> abduce::config::Config {
    let mut config = config_with_literals(dir, &["variable:0x080e3f4c:4", "constant:0x7"]);
    config.ct_mode = true;
    config.with_inequalities = true;
    config.max_depth = Some(1);
    config.collect_until_timeout = true;
    config.solver_timeout = Some(3600);
    config
}

#[test]
fn branch_partition_is_recovered_and_split_is_recommended() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = scripted_context(branch_config(&dir), branch_oracle());
    let summary = ctx.solve().unwrap();

    // Both sides of the partition survive collection and the post-filter.
    assert_eq!(
        summary.nas_conditions_all,
        vec![format!("{{{GT}}}"), format!("{{{EQ}}}")]
    );

    // Branch-first ranking around the detected pivot.
    assert_eq!(summary.selection_mode.as_deref(), Some("branch-first"));
    let reason = summary.selection_reason.unwrap();
    let key = reason.branch_key.unwrap();
    assert_eq!(key.variable, "@[0x080e3f4c,4]");
    assert_eq!(key.pivot_constant, "0x00000007");

    assert_eq!(
        summary.selected_policy_representative.as_deref(),
        Some(format!("{{{GT}}}").as_str())
    );

    // The classic partition compacts to a single non-strict comparison.
    assert_eq!(
        summary.policy_condition_compact.as_deref(),
        Some("{(0x00000007 <=s @[0x080e3f4c,4])}")
    );
    assert_eq!(summary.selected_policy, summary.policy_condition_compact);

    // Branch-guided derivation validates both explicit branches.
    assert_eq!(summary.branch_guided_policies.len(), 1);
    let guided = &summary.branch_guided_policies[0];
    assert_eq!(guided.variable, "@[0x080e3f4c,4]");
    assert_eq!(guided.true_branch.formula, format!("{{{GT}}}"));
    assert_eq!(guided.false_branch.formula, format!("{{{LEQ}}}"));
    assert!(guided.recommended_split);
    assert_eq!(
        guided.true_branch.ct.as_ref().map(|ct| ct.status),
        Some(CtStatus::Secure)
    );

    // Validation of the selected policy against the unconstrained baseline.
    let validation = summary.ct_validation.unwrap();
    assert_eq!(validation.baseline.status, CtStatus::Insecure);
    assert_eq!(validation.selected.status, CtStatus::Secure);
}

#[test]
fn policy_semantics_identify_the_partition() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = scripted_context(branch_config(&dir), branch_oracle());
    let summary = ctx.solve().unwrap();

    let semantics = summary.policy_semantics.unwrap();
    assert_eq!(semantics.policy_ids, vec!["P1".to_owned(), "P2".to_owned()]);
    assert_eq!(semantics.selected_policy_id.as_deref(), Some("P1"));
    assert_eq!(semantics.or_expression, "P1 OR P2");

    // Pinning the word above seven and pinning it to seven cannot coexist.
    assert_eq!(semantics.pairwise_compatibility.len(), 1);
    assert_eq!(
        semantics.pairwise_compatibility[0].relation,
        "mutually_exclusive"
    );

    assert_eq!(semantics.branch_partitions.len(), 1);
    let partition = &semantics.branch_partitions[0];
    assert_eq!(partition.variable, "@[0x080e3f4c,4]");
    assert_eq!(partition.pivot_constant, "0x00000007");
    assert_eq!(partition.greater_than, vec!["P1".to_owned()]);
    assert_eq!(partition.equal, vec!["P2".to_owned()]);
    assert!(partition.can_merge_to_geq);
    assert!(!partition.can_merge_to_leq);
}

#[test]
fn finalization_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = scripted_context(branch_config(&dir), branch_oracle());
    let first = ctx.solve().unwrap();

    // A second pass over the already-filtered storage changes nothing.
    let second = ctx.finalize().unwrap();
    assert_eq!(first.nas_conditions_all, second.nas_conditions_all);
    assert_eq!(first.selected_policy, second.selected_policy);
    assert_eq!(first.alternatives, second.alternatives);
}

#[test]
fn unknown_ct_candidates_are_recorded_without_update() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = branch_config(&dir);
    config.collect_until_timeout = false;

    // Candidates answer unknown until the equal policy appears.
    let mut oracle = ScriptedOracle::default();
    oracle.ct = Box::new(|assumptions: &[String]| {
        if assumptions.len() == 1 && assumptions[0] == EQ {
            return secure();
        }
        if !assumptions.is_empty() && assumptions.iter().all(|a| a.starts_with("!(")) {
            return insecure();
        }
        abduce::oracle::CtOutcome {
            status: CtStatus::Unknown,
            leaks: Vec::new(),
        }
    });

    let mut ctx = scripted_context(config, oracle);
    let summary = ctx.solve().unwrap();

    // Unknown verdicts contributed neither solutions nor counter-examples.
    assert_eq!(
        summary.nas_conditions_all,
        vec![format!("{{{EQ}}}")]
    );
    assert_eq!(summary.stats.core.solutions, 1);
    assert_eq!(summary.stats.core.counterexamples, 0);
}
