//! Agent Card generation for `.well-known/agent.json`.

use crate::a2a::types::*;
use crate::config::A2aConfig;

pub const AGENT_NAME: &str = "Tavily Agent";
pub const AGENT_DESCRIPTION: &str =
    "Search the web with the Tavily API and answer questions about the results.";
pub const ICON_URL: &str =
    "https://raw.githubusercontent.com/a2anet/tavily-agent/refs/heads/main/tavily_logo.jpeg";
pub const PROTOCOL_VERSION: &str = "0.2.6";

/// Content types accepted and produced by the agent.
pub const INPUT_MODES: &[&str] = &["text", "text/plain"];
pub const OUTPUT_MODES: &[&str] = &["text", "text/plain"];

fn modes(modes: &[&str]) -> Vec<String> {
    modes.iter().map(|m| m.to_string()).collect()
}

/// Build the Agent Card advertised at the configured public URL.
pub fn build_agent_card(config: &A2aConfig) -> AgentCard {
    let skill = AgentSkill {
        id: "search-web".to_string(),
        name: "Search Web".to_string(),
        description: AGENT_DESCRIPTION.to_string(),
        tags: vec!["search".to_string(), "web".to_string(), "tavily".to_string()],
        examples: vec!["Who is Leo Messi?".to_string()],
        input_modes: Vec::new(),
        output_modes: Vec::new(),
    };

    AgentCard {
        name: AGENT_NAME.to_string(),
        description: AGENT_DESCRIPTION.to_string(),
        url: config.public_url(),
        icon_url: Some(ICON_URL.to_string()),
        provider: None,
        version: crate::VERSION.to_string(),
        documentation_url: None,
        protocol_version: PROTOCOL_VERSION.to_string(),
        preferred_transport: "JSONRPC".to_string(),
        capabilities: AgentCapabilities {
            streaming: true,
            push_notifications: false,
            state_transition_history: false,
        },
        default_input_modes: modes(INPUT_MODES),
        default_output_modes: modes(OUTPUT_MODES),
        skills: vec![skill],
    }
}
