use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use experiment_gateway::build_router;
use experiment_gateway::config::Args;
use experiment_gateway::experiments::ExperimentCatalog;
use experiment_gateway::rate_limit::sweeper;
use experiment_gateway::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // parse cli arguments
    let args = Args::parse();

    let catalog = match &args.experiments {
        Some(path) => ExperimentCatalog::load(path)?,
        None => ExperimentCatalog::builtin(),
    };
    for experiment in catalog.iter() {
        info!(
            name = %experiment.name,
            variants = ?experiment.variants,
            distribution = ?experiment.distribution,
            active = experiment.active,
            "Experiment loaded"
        );
    }

    let policies = args.policies();
    let state = Arc::new(AppState::new(catalog, policies));

    // entries otherwise live for the whole process
    if let Some(every) = args.sweep_interval() {
        tokio::spawn(sweeper(state.rate_limiter.clone(), every));
    }

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "Gateway running");
    info!(
        contact = policies.contact.max_requests,
        track = policies.track.max_requests,
        variant = policies.variant.max_requests,
        window_secs = args.rate_window_secs,
        "Rate limits per window"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
