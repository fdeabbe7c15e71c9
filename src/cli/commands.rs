//! Subcommand implementations.

use crate::a2a::agent_card::{AGENT_NAME, build_agent_card};
use crate::a2a::{SearchAgentExecutor, start_server};
use crate::ask::start_ask_server;
use crate::brain::agent::SearchAgent;
use crate::brain::provider::{create_openai_provider, create_provider};
use crate::brain::tools::{TavilySearchTool, ToolRegistry};
use crate::config::Config;
use crate::logging;
use crate::telemetry::Telemetry;
use anyhow::{Context, Result};
use std::sync::Arc;

pub(super) fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

fn apply_listen_flags(bind: &mut String, port: &mut u16, flag_bind: Option<String>, flag_port: Option<u16>) {
    if let Some(b) = flag_bind {
        *bind = b;
    }
    if let Some(p) = flag_port {
        *port = p;
    }
}

/// Run the A2A relay until shutdown.
pub(super) async fn cmd_serve(
    mut config: Config,
    port: Option<u16>,
    bind: Option<String>,
    debug: bool,
) -> Result<()> {
    apply_listen_flags(&mut config.a2a.bind, &mut config.a2a.port, bind, port);
    config.validate_for_relay()?;

    let telemetry = if config.telemetry.enabled {
        Some(Telemetry::init(AGENT_NAME, &config.telemetry)?)
    } else {
        None
    };
    let _guard = logging::init(&config.logging, debug, telemetry.as_ref())?;

    let provider = create_provider(&config)?;
    let search = TavilySearchTool::from_config(&config.search).context("Failed to create search tool")?;
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(search));

    let agent = SearchAgent::new(provider, Arc::new(tools)).with_config(&config.agent);
    tracing::info!("Search agent using model {}", agent.model());
    let executor = SearchAgentExecutor::new(agent).with_forward_tool_calls(config.a2a.forward_tool_calls);

    let result = start_server(&config.a2a, Arc::new(executor)).await;
    if let Some(telemetry) = telemetry {
        telemetry.shutdown();
    }
    result
}

/// Run the question-answering service until shutdown. Telemetry is always on.
pub(super) async fn cmd_ask(
    mut config: Config,
    port: Option<u16>,
    bind: Option<String>,
    debug: bool,
) -> Result<()> {
    apply_listen_flags(&mut config.ask.bind, &mut config.ask.port, bind, port);

    let telemetry = Telemetry::init(&config.ask.service_name, &config.telemetry)?;
    let _guard = logging::init(&config.logging, debug, Some(&telemetry))?;

    let provider = create_openai_provider(&config)?;
    let result = start_ask_server(&config.ask, Arc::new(provider)).await;
    telemetry.shutdown();
    result
}

pub(super) fn cmd_card(config: &Config) -> Result<()> {
    let card = build_agent_card(&config.a2a);
    println!("{}", serde_json::to_string_pretty(&card)?);
    Ok(())
}

pub(super) fn cmd_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
