use crate::infra::{parse_date, read_json};
use chrono::{Datelike, Local, NaiveDate};
use clap::Args;
use psak_risk::config::AppConfig;
use psak_risk::error::AppError;
use psak_risk::fla::{AdjustmentRequest, ProbabilityPolicy, ScenarioAdjuster, WeightedAdjustment};
use psak_risk::migration::{
    build_default_matrix, observations_from_path, validate_with_tolerance, CollectibilityState,
    MatrixPeriod, MigrationError, MigrationMatrix, MigrationMatrixEntry,
};
use psak_risk::staging::{
    evaluate, simulate, EvaluationContext, SimulationSummary, StagingEvaluation, StagingRule,
    TransactionProfile,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct StagingEvaluateArgs {
    /// JSON file holding the rule list
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// JSON file holding the transaction attributes
    #[arg(long)]
    pub(crate) context: PathBuf,
    /// Print the full evaluation as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct StagingSimulateArgs {
    /// JSON file holding the rule list
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// JSON file holding `[{ transactionId, attributes }]`
    #[arg(long)]
    pub(crate) transactions: PathBuf,
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct MatrixValidateArgs {
    /// JSON file holding migration matrix entries
    #[arg(long)]
    pub(crate) entries: PathBuf,
    /// Period start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) period_start: NaiveDate,
    /// Period end (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) period_end: NaiveDate,
}

#[derive(Args, Debug)]
pub(crate) struct MatrixEstimateArgs {
    /// CSV with facility_id,period_start,period_end,from_state,to_state
    #[arg(long)]
    pub(crate) observations: PathBuf,
    #[arg(long, value_parser = parse_date)]
    pub(crate) period_start: NaiveDate,
    #[arg(long, value_parser = parse_date)]
    pub(crate) period_end: NaiveDate,
    /// Number of periods for the cumulative default curve
    #[arg(long, default_value_t = 3)]
    pub(crate) horizon: u32,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DefaultMatrixArgs {
    /// Diagonal (stay) probability; defaults to RISK_DEFAULT_STAY or 0.8
    #[arg(long)]
    pub(crate) stay: Option<f64>,
    /// Period start (YYYY-MM-DD). Defaults to January 1 of the current year.
    #[arg(long, value_parser = parse_date)]
    pub(crate) period_start: Option<NaiveDate>,
    /// Period end (YYYY-MM-DD). Defaults to December 31 of the start year.
    #[arg(long, value_parser = parse_date)]
    pub(crate) period_end: Option<NaiveDate>,
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct WeightedArgs {
    /// JSON file with basePd, baseLgd, scenarios, adjustments, segment, advanced
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// clamp, propagate, or reject; defaults to RISK_PROBABILITY_POLICY
    #[arg(long, value_parser = parse_policy)]
    pub(crate) policy: Option<ProbabilityPolicy>,
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_policy(raw: &str) -> Result<ProbabilityPolicy, String> {
    ProbabilityPolicy::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not one of clamp, propagate, reject"))
}

pub(crate) fn run_staging_evaluate(args: StagingEvaluateArgs) -> Result<(), AppError> {
    let rules: Vec<StagingRule> = read_json(&args.rules)?;
    let context: EvaluationContext = read_json(&args.context)?;
    let evaluation = evaluate(&rules, &context);

    if args.json {
        return print_json(&evaluation);
    }
    render_evaluation(&evaluation);
    Ok(())
}

pub(crate) fn run_staging_simulate(args: StagingSimulateArgs) -> Result<(), AppError> {
    let rules: Vec<StagingRule> = read_json(&args.rules)?;
    let transactions: Vec<TransactionProfile> = read_json(&args.transactions)?;
    let summary = simulate(&rules, &transactions);

    if args.json {
        return print_json(&summary);
    }
    render_simulation(&summary);
    Ok(())
}

pub(crate) fn run_matrix_validate(args: MatrixValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let entries: Vec<MigrationMatrixEntry> = read_json(&args.entries)?;
    let period = MatrixPeriod::new(args.period_start, args.period_end);
    let report = validate_with_tolerance(&entries, &period, config.engine.matrix_tolerance);

    println!(
        "Migration matrix {} (tolerance ±{})",
        period, report.tolerance
    );
    for row in &report.rows {
        let marker = if report
            .imbalances
            .iter()
            .any(|imbalance| imbalance.from_state == row.from_state)
        {
            "UNBALANCED"
        } else {
            "ok"
        };
        println!(
            "- from {} ({}): sum {:.4} over {} entries [{}]",
            row.from_state,
            row.from_state.label(),
            row.sum,
            row.entries,
            marker
        );
    }

    if report.is_valid() {
        println!("All rows balanced.");
        Ok(())
    } else {
        Err(MigrationError::RowImbalance {
            period,
            imbalances: report.imbalances,
        }
        .into())
    }
}

pub(crate) fn run_matrix_estimate(args: MatrixEstimateArgs) -> Result<(), AppError> {
    let observations = observations_from_path(&args.observations)?;
    let period = MatrixPeriod::new(args.period_start, args.period_end);
    let estimated = MigrationMatrix::from_observations(&observations, period)?;

    println!(
        "Estimated migration matrix {} from {} of {} observations",
        period,
        estimated.observations_used,
        observations.len()
    );
    render_matrix(&estimated.matrix);
    if !estimated.unobserved_states.is_empty() {
        let codes: Vec<&str> = estimated
            .unobserved_states
            .iter()
            .map(|state| state.code())
            .collect();
        println!(
            "No history for states {}; treated as staying put.",
            codes.join(", ")
        );
    }

    println!("\nCumulative probability of reaching state 5:");
    for curve in estimated.matrix.default_term_structure(args.horizon)? {
        let points: Vec<String> = curve
            .cumulative
            .iter()
            .map(|probability| format!("{:.2}%", probability * 100.0))
            .collect();
        println!("- from {}: {}", curve.from_state, points.join(" -> "));
    }
    Ok(())
}

pub(crate) fn run_default_matrix(args: DefaultMatrixArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let stay = args.stay.unwrap_or(config.engine.default_stay_probability);
    let period = default_period(args.period_start, args.period_end)?;
    let matrix = build_default_matrix(period, stay)?;

    if args.json {
        return print_json(&matrix.to_entries());
    }

    println!("Default migration matrix {} (stay {:.2})", period, stay);
    render_matrix(&matrix);
    let stats = matrix.statistics();
    println!(
        "Average stay {:.2}% | downgrade {:.2}% | upgrade {:.2}% | to default {:.2}%",
        stats.average_stay * 100.0,
        stats.average_downgrade * 100.0,
        stats.average_upgrade * 100.0,
        stats.default_transition * 100.0
    );
    Ok(())
}

pub(crate) fn run_weighted(args: WeightedArgs) -> Result<(), AppError> {
    let request: AdjustmentRequest = read_json(&args.input)?;
    let policy = match args.policy {
        Some(policy) => policy,
        None => AppConfig::load()?.engine.probability_policy,
    };
    let result = ScenarioAdjuster::new(policy).apply(&request)?;

    if args.json {
        return print_json(&result);
    }
    render_weighted(&request, &result);
    Ok(())
}

fn default_period(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<MatrixPeriod, AppError> {
    let start = match start {
        Some(start) => start,
        None => NaiveDate::from_ymd_opt(Local::now().year(), 1, 1)
            .ok_or_else(|| AppError::from(default_period_error()))?,
    };
    let end = match end {
        Some(end) => end,
        None => NaiveDate::from_ymd_opt(start.year(), 12, 31)
            .ok_or_else(|| AppError::from(default_period_error()))?,
    };
    Ok(MatrixPeriod::new(start, end))
}

fn default_period_error() -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        "unable to derive a default matrix period",
    )
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn render_evaluation(evaluation: &StagingEvaluation) {
    match (&evaluation.stage, &evaluation.matched_rule) {
        (Some(stage), Some(rule)) => println!(
            "Stage: {} ({}) via rule '{}' [{}]",
            stage,
            stage.description(),
            rule.name,
            rule.id
        ),
        _ => println!("Stage: UNASSIGNED (no active rule matched; add a default rule)"),
    }

    for step in &evaluation.trace {
        let verdict = if step.matched { "matched" } else { "no match" };
        println!(
            "- p{} {} -> {}: {}",
            step.priority, step.rule_id, step.stage_result, verdict
        );
        if step.is_default {
            println!("    default rule");
        }
        for criterion in &step.criteria {
            let mark = if criterion.matched { "+" } else { "-" };
            println!("    {} {}", mark, criterion.reason);
        }
    }
}

pub(crate) fn render_simulation(summary: &SimulationSummary) {
    println!("Simulated {} transactions", summary.total);
    for entry in &summary.distribution {
        println!(
            "- {}: {} ({:.1}%)",
            entry.stage,
            entry.count,
            entry.share * 100.0
        );
    }
    println!("Rule hits:");
    for hit in &summary.rule_hits {
        println!("- {} [{}]: {}", hit.rule_name, hit.rule_id, hit.hits);
    }
    if !summary.unassigned.is_empty() {
        println!("Unassigned: {}", summary.unassigned.join(", "));
    }
}

pub(crate) fn render_matrix(matrix: &MigrationMatrix) {
    let states = CollectibilityState::ordered();
    let header: Vec<String> = states
        .iter()
        .map(|state| format!("{:>8}", state.code()))
        .collect();
    println!("from\\to {}", header.join(""));
    for from in states {
        let cells: Vec<String> = matrix
            .row(from)
            .iter()
            .map(|probability| format!("{:>7.2}%", probability * 100.0))
            .collect();
        println!("{:>7} {}", from.code(), cells.join(""));
    }
}

pub(crate) fn render_weighted(request: &AdjustmentRequest, result: &WeightedAdjustment) {
    println!(
        "Segment {} | base PD {:.4} | base LGD {:.4} | policy {}",
        result.segment, request.base_pd, request.base_lgd, result.policy
    );
    for scenario in &result.per_scenario {
        println!(
            "- {} ({}, p={:.2}): PD x{:.2} LGD x{:.2} [{:?}] -> PD {:.4} LGD {:.4}",
            scenario.scenario_name,
            scenario.scenario_type,
            scenario.probability,
            scenario.pd_factor * scenario.custom_pd_multiplier,
            scenario.lgd_factor * scenario.custom_lgd_multiplier,
            scenario.factor_source,
            scenario.adjusted_pd,
            scenario.adjusted_lgd
        );
    }
    println!(
        "Weighted PD {:.4} | weighted LGD {:.4}",
        result.weighted_pd, result.weighted_lgd
    );
    for warning in &result.warnings {
        println!("  warning: {:?}", warning);
    }
}
