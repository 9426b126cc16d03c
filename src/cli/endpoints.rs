//! Endpoints command handlers

use crate::cli::output::{format_endpoints_json, format_endpoints_table, EndpointRow};
use crate::cli::{EndpointsListArgs, EndpointsTestArgs};
use crate::config::WardenConfig;
use crate::orchestrator::Orchestrator;
use colored::Colorize;

fn load_config(path: &std::path::Path) -> Result<WardenConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        WardenConfig::load(Some(path))?
    } else {
        WardenConfig::default()
    };
    Ok(config)
}

/// Handle `warden endpoints list`
pub fn handle_list(args: &EndpointsListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    let rows: Vec<EndpointRow> = config.endpoints.iter().map(EndpointRow::from).collect();

    if args.json {
        println!("{}", format_endpoints_json(&rows));
    } else if rows.is_empty() {
        println!("No endpoints configured in {}", args.config.display());
    } else {
        println!("{}", format_endpoints_table(&rows));
    }

    Ok(())
}

/// Handle `warden endpoints test`
///
/// Forces an authenticate + version-probe cycle against one configured
/// endpoint and reports reachability. Exits non-zero on failure so the
/// command is scriptable.
pub async fn handle_test(args: &EndpointsTestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    let endpoint = config
        .endpoints
        .iter()
        .find(|e| e.id == args.id)
        .cloned()
        .ok_or_else(|| format!("endpoint '{}' not found in {}", args.id, args.config.display()))?;

    // A one-shot core: no polling, no background loops
    config.poller.enabled = false;
    config.endpoints.clear();
    let orchestrator = Orchestrator::new(config);
    orchestrator.add_endpoint(endpoint)?;

    if orchestrator.test_endpoint(&args.id).await? {
        println!("{} endpoint '{}' is reachable", "✓".green(), args.id);
        Ok(())
    } else {
        let cause = orchestrator
            .list_connections()
            .into_iter()
            .find(|c| c.id == args.id)
            .and_then(|c| c.last_error)
            .unwrap_or_else(|| "unknown error".to_string());
        Err(format!("endpoint '{}' is unreachable: {}", args.id, cause).into())
    }
}
