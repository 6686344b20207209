use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scheduling_service::domain::engine;
use scheduling_service::domain::entities::shift::default_shift_catalog;
use scheduling_service::domain::entities::{Resource, Role, SchedulingContext};
use scheduling_service::domain::ruleset::load_default_rules;

/// Demo entry point: builds a small in-memory context and runs both engines.
///
/// This binary stands in for seed/preview tooling; the HTTP surface and
/// persistence layer that would normally drive this engine are external
/// collaborators and out of scope for this crate.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scheduling_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Running scheduling engine demo");

    let resources = vec![
        Resource::new(1, Role::Cook),
        Resource::new(2, Role::Cook),
        Resource::new(3, Role::KitchenAssistant),
        Resource::new(4, Role::KitchenAssistant),
        Resource::new(5, Role::PotWasher),
        Resource::new(6, Role::Apprentice),
        Resource::new(7, Role::ReliefCook),
    ];

    let context = SchedulingContext::new(
        "2024-11",
        resources,
        default_shift_catalog(),
        load_default_rules().clone(),
    )?;

    let heuristic_result = engine::run_heuristic(&context)?;
    tracing::info!(
        entries = heuristic_result.entries.len(),
        violations = heuristic_result.violations.len(),
        "heuristic engine finished"
    );

    let final_result = engine::run_optimizer_or_fallback(&context);
    tracing::info!(
        engine = ?final_result.engine,
        status = ?final_result.status,
        entries = final_result.entries.len(),
        violations = final_result.violations.len(),
        "optimizer-or-fallback finished"
    );

    Ok(())
}
