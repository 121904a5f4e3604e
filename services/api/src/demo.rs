use crate::commands::{render_evaluation, render_matrix, render_simulation, render_weighted};
use crate::infra::{parse_date, sample_adjustments, sample_rules, sample_scenarios};
use chrono::NaiveDate;
use clap::Args;
use psak_risk::config::AppConfig;
use psak_risk::ecl::{portfolio_ecl, EclInput};
use psak_risk::error::AppError;
use psak_risk::fla::{AdjustmentRequest, ScenarioAdjuster};
use psak_risk::migration::{
    build_default_matrix, parse_observations, CollectibilityState, MatrixPeriod, MigrationMatrix,
};
use psak_risk::staging::{
    simulate, EvaluationContext, RuleSet, StagingServiceError, TransactionProfile,
};

const SAMPLE_HISTORY: &str = "facility_id,period_start,period_end,from_state,to_state
FAC-1001,2024-01-01,2024-12-31,1,1
FAC-1002,2024-01-01,2024-12-31,1,1
FAC-1003,2024-01-01,2024-12-31,1,1
FAC-1004,2024-01-01,2024-12-31,1,2
FAC-1005,2024-01-01,2024-12-31,2,1
FAC-1006,2024-01-01,2024-12-31,2,3
FAC-1007,2024-01-01,2024-12-31,2,2
FAC-1008,2024-01-01,2024-12-31,3,4
FAC-1009,2024-01-01,2024-12-31,3,5
FAC-1010,2024-01-01,2024-12-31,4,5
FAC-1011,2024-01-01,2024-12-31,5,5
";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Portfolio segment used for scenario adjustment lookups
    #[arg(long, default_value = "Corporate")]
    pub(crate) segment: String,
    /// Matrix period start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, default_value = "2024-01-01")]
    pub(crate) period_start: NaiveDate,
    /// Matrix period end (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, default_value = "2024-12-31")]
    pub(crate) period_end: NaiveDate,
}

struct DemoFacility {
    profile: TransactionProfile,
    exposure: f64,
    pd_12_month: f64,
    pd_lifetime: f64,
    lgd: f64,
}

fn sample_facilities() -> Vec<DemoFacility> {
    let facility = |id: &str, context: EvaluationContext, exposure, pd_12_month, pd_lifetime| {
        DemoFacility {
            profile: TransactionProfile {
                transaction_id: id.to_string(),
                attributes: context,
            },
            exposure,
            pd_12_month,
            pd_lifetime,
            lgd: 0.45,
        }
    };

    vec![
        facility(
            "MUR-0001",
            EvaluationContext::new()
                .with("dpd", 0)
                .with("collectibility", "1")
                .with("pd_increase_pct", 10)
                .with("watchlist", false),
            2_500_000_000.0,
            0.012,
            0.05,
        ),
        facility(
            "MUS-0042",
            EvaluationContext::new()
                .with("dpd", 45)
                .with("collectibility", "2")
                .with("pd_increase_pct", 40)
                .with("watchlist", false),
            900_000_000.0,
            0.035,
            0.14,
        ),
        facility(
            "IJR-0107",
            EvaluationContext::new()
                .with("dpd", 10)
                .with("collectibility", "1")
                .with("pd_increase_pct", 130)
                .with("watchlist", false),
            1_200_000_000.0,
            0.028,
            0.11,
        ),
        facility(
            "MUR-0233",
            EvaluationContext::new()
                .with("dpd", 120)
                .with("collectibility", "4")
                .with("pd_increase_pct", 300)
                .with("watchlist", true),
            400_000_000.0,
            0.4,
            0.75,
        ),
    ]
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        segment,
        period_start,
        period_end,
    } = args;
    let config = AppConfig::load()?;

    println!("PSAK 71 credit-risk demo");

    println!("\n== Staging ==");
    let rule_set = RuleSet::new(sample_rules()).map_err(StagingServiceError::from)?;
    let facilities = sample_facilities();
    let profiles: Vec<TransactionProfile> = facilities
        .iter()
        .map(|facility| facility.profile.clone())
        .collect();
    let summary = simulate(rule_set.rules(), &profiles);
    render_simulation(&summary);

    if let Some(example) = profiles.get(2) {
        println!("\nTrace for {}:", example.transaction_id);
        render_evaluation(&rule_set.evaluate(&example.attributes));
    }

    println!("\n== Migration matrix ==");
    let period = MatrixPeriod::new(period_start, period_end);
    let default_matrix = build_default_matrix(period, config.engine.default_stay_probability)?;
    println!("Default starting matrix:");
    render_matrix(&default_matrix);

    let observations = parse_observations(SAMPLE_HISTORY.as_bytes())?;
    let estimated = MigrationMatrix::from_observations(&observations, period)?;
    println!(
        "\nEstimated from {} historical movements:",
        estimated.observations_used
    );
    render_matrix(&estimated.matrix);
    let stats = estimated.matrix.statistics();
    println!(
        "Average stay {:.1}% | downgrade {:.1}% | default transition {:.1}%",
        stats.average_stay * 100.0,
        stats.average_downgrade * 100.0,
        stats.default_transition * 100.0
    );
    println!(
        "3-period default probability from Lancar: {:.2}%",
        estimated
            .matrix
            .cumulative_default_probability(CollectibilityState::Current, 3)
            * 100.0
    );

    println!("\n== Forward-looking adjustment ==");
    let adjuster = ScenarioAdjuster::new(config.engine.probability_policy);
    let mut ecl_inputs = Vec::with_capacity(facilities.len());
    for (facility, outcome) in facilities.iter().zip(&summary.outcomes) {
        let Some(stage) = outcome.stage else {
            println!(
                "{} has no stage; excluded from ECL",
                facility.profile.transaction_id
            );
            continue;
        };

        let request = AdjustmentRequest {
            base_pd: facility.pd_lifetime,
            base_lgd: facility.lgd,
            scenarios: sample_scenarios(),
            adjustments: sample_adjustments(),
            segment: segment.clone(),
            advanced: None,
        };
        let weighted = adjuster.apply(&request)?;
        println!("\n{} ({})", facility.profile.transaction_id, stage);
        render_weighted(&request, &weighted);

        // lifetime uplift carried over to the 12-month horizon
        let uplift = if facility.pd_lifetime > 0.0 {
            weighted.weighted_pd / facility.pd_lifetime
        } else {
            1.0
        };
        ecl_inputs.push(EclInput {
            facility_id: Some(facility.profile.transaction_id.clone()),
            stage,
            exposure_at_default: facility.exposure,
            pd_12_month: (facility.pd_12_month * uplift).min(weighted.weighted_pd),
            pd_lifetime: weighted.weighted_pd,
            lgd: weighted.weighted_lgd,
        });
    }

    println!("\n== Expected credit loss ==");
    let (results, total) = portfolio_ecl(&ecl_inputs)?;
    for result in &results {
        println!(
            "- {}: {} | PD {:.4} ({:?}) | LGD {:.4} | ECL {:.0}",
            result.facility_id.as_deref().unwrap_or("-"),
            result.stage,
            result.applied_pd,
            result.horizon,
            result.lgd,
            result.expected_credit_loss
        );
    }
    println!("Portfolio ECL: {:.0}", total);

    Ok(())
}
