use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use super::client::HkubeClient;
use super::registry::{required_endpoints, ToolRegistry, ToolUnit, UnitFactory};
use super::{algorithms, exec, instructions, jobs, pipelines, resource_tools};
use crate::config::Config;
use crate::endpoint::EndpointTable;
use crate::resources::ResourceStore;

/// Tool units compiled into the server, in registration order
pub fn builtin_units() -> Vec<ToolUnit> {
    vec![
        ToolUnit {
            name: "algorithms",
            endpoints: algorithms::ENDPOINTS,
            factory: UnitFactory::Plain(algorithms::tools),
        },
        ToolUnit {
            name: "pipelines",
            endpoints: pipelines::ENDPOINTS,
            factory: UnitFactory::Plain(pipelines::tools),
        },
        ToolUnit {
            name: "jobs",
            endpoints: jobs::ENDPOINTS,
            factory: UnitFactory::Plain(jobs::tools),
        },
        ToolUnit {
            name: "exec",
            endpoints: exec::ENDPOINTS,
            factory: UnitFactory::Plain(exec::tools),
        },
        ToolUnit {
            name: "instructions",
            endpoints: &[],
            factory: UnitFactory::Plain(instructions::tools),
        },
        ToolUnit {
            name: "resources",
            endpoints: &[],
            factory: UnitFactory::WithResources(resource_tools::tools),
        },
    ]
}

/// Build the registry the server hosts: endpoints checked against every
/// unit's needs, resources loaded once, then discovery.
pub fn registry_from_config(config: &Config) -> Result<ToolRegistry> {
    let units = builtin_units();
    let endpoints = EndpointTable::from_config(config)
        .context("Invalid HKube endpoint configuration")?;
    endpoints
        .require(required_endpoints(&units))
        .context("Invalid HKube endpoint configuration")?;

    let resources = Arc::new(ResourceStore::load_dir(&config.resources_dir)?);
    let client = HkubeClient::new(
        Arc::new(endpoints),
        Duration::from_secs(config.tool_timeout_secs),
    )?;

    let registry = ToolRegistry::discover(&units, &client, resources)?;
    Ok(registry)
}
