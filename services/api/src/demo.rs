use std::collections::BTreeMap;
use std::time::Duration;

use clap::Args;

use crate::infra::{build_pipeline, default_risk_config, demo_targets};
use recall_sentinel::error::AppError;
use recall_sentinel::monitoring::classification::{fields, Incident, RiskClassifier};
use recall_sentinel::monitoring::investigations::{
    ListingKey, ListingRepository, MarketplaceId, MonitoringScope, MonitoringServiceError,
    RunDisposition,
};

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Reported injuries
    #[arg(long, default_value_t = 0.0)]
    injuries: f64,
    /// Reported deaths
    #[arg(long, default_value_t = 0.0)]
    deaths: f64,
    /// Reported incident count
    #[arg(long, default_value_t = 0.0)]
    incidents: f64,
    /// Units affected by the recall
    #[arg(long, default_value_t = 0.0)]
    units_affected: f64,
    /// Hazard description line fed to the keyword rules (repeatable)
    #[arg(long)]
    hazard: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Reported injuries
    #[arg(long, default_value_t = 0.0)]
    injuries: f64,
    /// Reported deaths; one is enough to force HIGH risk
    #[arg(long, default_value_t = 1.0)]
    deaths: f64,
    /// Units affected by the recall
    #[arg(long, default_value_t = 250_000.0)]
    units_affected: f64,
    /// Hazard description line (repeatable)
    #[arg(long)]
    hazard: Vec<String>,
    /// Marketplaces to search
    #[arg(long, default_values_t = vec!["ebay".to_string(), "craigslist".to_string()])]
    marketplace: Vec<String>,
}

fn build_incident(injuries: f64, deaths: f64, incidents: f64, units: f64, hazards: &[String]) -> Incident {
    let mut incident = Incident::new()
        .with_stat(fields::INJURIES, injuries)
        .with_stat(fields::DEATHS, deaths)
        .with_stat(fields::INCIDENTS, incidents)
        .with_stat(fields::UNITS_AFFECTED, units);
    for hazard in hazards {
        incident = incident.with_hazard(hazard);
    }
    incident
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let incident = build_incident(
        args.injuries,
        args.deaths,
        args.incidents,
        args.units_affected,
        &args.hazard,
    );
    let classifier =
        RiskClassifier::new(default_risk_config()).map_err(MonitoringServiceError::from)?;
    let outcome = classifier.classify(&incident);

    println!(
        "Risk level {} (score {:.2})",
        outcome.level.name(),
        outcome.score
    );
    for component in &outcome.components {
        println!(
            "  - {:?}: {:+.2} ({})",
            component.kind, component.contribution, component.notes
        );
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Recall monitoring demo");

    let pipeline = build_pipeline(Duration::from_secs(5));
    let incident = build_incident(
        args.injuries,
        args.deaths,
        0.0,
        args.units_affected,
        &args.hazard,
    );
    println!(
        "Incident: {} injuries, {} deaths, {} units affected",
        args.injuries, args.deaths, args.units_affected
    );

    let scope = MonitoringScope {
        target_ids: demo_targets()
            .into_iter()
            .map(|target| target.target_id)
            .collect(),
        marketplace_ids: args
            .marketplace
            .iter()
            .map(|name| MarketplaceId(name.clone()))
            .collect(),
        region_ids: BTreeMap::new(),
    };
    let decision = pipeline.service.monitor(&incident, scope)?;

    println!(
        "- Risk level {} (score {:.2})",
        decision.outcome.level.name(),
        decision.outcome.score
    );
    for component in &decision.outcome.components {
        println!(
            "  - {:?}: {:+.2} ({})",
            component.kind, component.contribution, component.notes
        );
    }
    let view = decision.investigation.status_view();
    println!(
        "- Investigation {} on a {} cadence, next fire {}",
        view.investigation_id.0, view.schedule, view.scheduled_start_time
    );

    // Run the first pass directly instead of waiting for the timer.
    let disposition = pipeline
        .service
        .scheduler()
        .run(&decision.investigation.investigation_id)
        .await
        .map_err(MonitoringServiceError::from)?;

    match disposition {
        RunDisposition::Completed { summary, next_fire } => {
            println!(
                "- Pass complete: {} listings found, {} queued for review",
                summary.listings_found, summary.listings_queued
            );
            for failure in &summary.failures {
                println!(
                    "  - {} search for {} failed: {}",
                    failure.marketplace_id.0, failure.target_id.0, failure.error
                );
            }
            if let Some(next_fire) = next_fire {
                println!("- Rescheduled; next pass at {next_fire}");
            }
        }
        RunDisposition::Failed => println!("- Pass failed; investigation parked for an operator"),
        RunDisposition::SkippedStale => println!("- Investigation was no longer runnable"),
    }

    println!("\nCanonical listings");
    for (marketplace_id, candidate) in pipeline.search.catalog() {
        let key = ListingKey {
            marketplace_id: marketplace_id.clone(),
            listing_url: candidate.url.clone(),
        };
        let Some(listing) = pipeline
            .listings
            .get_by_key(&key)
            .map_err(MonitoringServiceError::from)?
        else {
            continue;
        };
        println!(
            "- [{}] {} | score {:.2}",
            marketplace_id.0, listing.title, listing.match_score
        );
        for reason in &listing.match_reasons {
            println!("    - {reason}");
        }
    }

    Ok(())
}
