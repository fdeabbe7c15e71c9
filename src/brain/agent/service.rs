//! ReAct search agent.
//!
//! Alternates model calls and tool calls until the model answers without
//! requesting a tool, then asks for a structured response that decides
//! whether the task is complete.

use crate::brain::provider::{LLMRequest, Provider, ToolChoice};
use crate::brain::tools::ToolRegistry;
use crate::config::AgentConfig;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::adapter::{AgentEvent, AgentMessage, MessageClassifier, to_provider_messages};
use super::checkpointer::{Checkpointer, MemoryCheckpointer, ThreadState};
use super::error::{AgentError, Result};
use super::prompts::{RESPONSE_FORMAT_INSTRUCTION, STRUCTURED_RESPONSE_TOOL, SYSTEM_INSTRUCTION};
use super::response::{StructuredResponse, get_agent_response};

/// Events of one run, ending with `AgentEvent::Response` or an error.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send>>;

/// Tool-calling agent with per-thread memory.
#[derive(Clone)]
pub struct SearchAgent {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    checkpointer: Arc<dyn Checkpointer>,
    model: String,
    max_iterations: usize,
    max_tokens: u32,
}

impl SearchAgent {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            tools,
            checkpointer: Arc::new(MemoryCheckpointer::new()),
            model,
            max_iterations: 10,
            max_tokens: 4096,
        }
    }

    /// Apply the `[agent]` config section.
    pub fn with_config(mut self, config: &AgentConfig) -> Self {
        if let Some(model) = &config.model {
            self.model = model.clone();
        }
        self.max_tokens = config.max_tokens;
        self.with_max_iterations(config.max_iterations)
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = checkpointer;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run `query` on thread `session_id`, streaming events as they happen.
    pub fn stream(&self, query: impl Into<String>, session_id: impl Into<String>) -> AgentStream {
        let (tx, rx) = mpsc::channel(32);
        let agent = self.clone();
        let query = query.into();
        let session_id = session_id.into();

        tokio::spawn(async move {
            if let Err(e) = agent.run(&query, &session_id, &tx).await {
                tracing::error!("Agent run on thread {} failed: {}", session_id, e);
                let _ = tx.send(Err(e)).await;
            }
        });

        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }))
    }

    async fn run(
        &self,
        query: &str,
        session_id: &str,
        tx: &mpsc::Sender<Result<AgentEvent>>,
    ) -> Result<()> {
        let mut state = self.checkpointer.load(session_id).await?;
        let mut classifier = MessageClassifier::new();
        tracing::info!(
            "Agent run on thread {} ({} prior messages)",
            session_id,
            state.messages.len()
        );

        // Whatever the run appended is kept, even when it fails midway
        let outcome = self
            .converse(query, session_id, &mut state, &mut classifier, tx)
            .await;
        let response = get_agent_response(state.structured_response.as_ref());
        let saved = self.checkpointer.save(session_id, state).await;

        outcome?;
        saved?;
        send(tx, AgentEvent::Response(response)).await
    }

    /// Append the query, run the tool loop and fetch the structured response.
    async fn converse(
        &self,
        query: &str,
        session_id: &str,
        state: &mut ThreadState,
        classifier: &mut MessageClassifier,
        tx: &mpsc::Sender<Result<AgentEvent>>,
    ) -> Result<()> {
        state.structured_response = None;
        append(state, AgentMessage::human(query), classifier, tx).await?;

        for iteration in 1..=self.max_iterations {
            let request = LLMRequest::new(&self.model, to_provider_messages(&state.messages))
                .with_system(SYSTEM_INSTRUCTION)
                .with_tools(self.tools.definitions())
                .with_max_tokens(self.max_tokens);
            let response = self.provider.complete(request).await?;

            let tool_calls: Vec<(String, String, Value)> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if response.content.is_empty() {
                tracing::warn!("Model returned an empty message on iteration {}", iteration);
                break;
            }
            append(state, AgentMessage::ai(response.content), classifier, tx).await?;

            if tool_calls.is_empty() {
                break;
            }

            tracing::debug!("Iteration {}: {} tool call(s)", iteration, tool_calls.len());
            let results = futures::future::join_all(
                tool_calls
                    .into_iter()
                    .map(|(id, name, input)| self.call_tool(id, name, input)),
            )
            .await;
            for message in results {
                append(state, message, classifier, tx).await?;
            }

            if iteration == self.max_iterations {
                tracing::warn!(
                    "Reached {} iterations on thread {}, requesting structured response",
                    self.max_iterations,
                    session_id
                );
            }
        }

        state.structured_response = self.structured_response(&state.messages).await?;
        Ok(())
    }

    async fn call_tool(&self, id: String, name: String, input: Value) -> AgentMessage {
        match self.tools.execute(&name, input).await {
            Ok(result) => AgentMessage::tool(id, name, result.output, !result.success),
            Err(e) => {
                tracing::warn!("Tool '{}' failed: {}", name, e);
                AgentMessage::tool(id, name, format!("Error: {}", e), true)
            }
        }
    }

    async fn structured_response(
        &self,
        messages: &[AgentMessage],
    ) -> Result<Option<StructuredResponse>> {
        let request = LLMRequest::new(&self.model, to_provider_messages(messages))
            .with_system(RESPONSE_FORMAT_INSTRUCTION)
            .with_tools(vec![StructuredResponse::tool_definition()])
            .with_tool_choice(ToolChoice::Tool(STRUCTURED_RESPONSE_TOOL.to_string()))
            .with_max_tokens(self.max_tokens);
        let response = self.provider.complete(request).await?;

        let Some((_, _, input)) = response
            .tool_uses()
            .into_iter()
            .find(|(_, name, _)| *name == STRUCTURED_RESPONSE_TOOL)
        else {
            tracing::warn!("Model did not return a structured response");
            return Ok(None);
        };

        match serde_json::from_value::<StructuredResponse>(input.clone()) {
            Ok(structured) => {
                tracing::info!("Structured response status: {:?}", structured.status);
                Ok(Some(structured))
            }
            Err(e) => {
                tracing::warn!("Malformed structured response {}: {}", input, e);
                Ok(None)
            }
        }
    }
}

async fn append(
    state: &mut ThreadState,
    message: AgentMessage,
    classifier: &mut MessageClassifier,
    tx: &mpsc::Sender<Result<AgentEvent>>,
) -> Result<()> {
    for event in classifier.classify(&message) {
        send(tx, event).await?;
    }
    state.messages.push(message);
    Ok(())
}

async fn send(tx: &mpsc::Sender<Result<AgentEvent>>, event: AgentEvent) -> Result<()> {
    tx.send(Ok(event))
        .await
        .map_err(|_| AgentError::Aborted("event receiver dropped".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::agent::response::{AgentResponse, StructuredStatus};
    use crate::brain::agent::test_helpers::{ScriptedProvider, search_agent, text, tool_use};
    use crate::brain::provider::{ContentBlock, Role};
    use futures::StreamExt;

    async fn collect(stream: AgentStream) -> Vec<Result<AgentEvent>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_search_then_complete() {
        let provider = ScriptedProvider::new(vec![
            vec![
                text("Searching."),
                tool_use("call_1", "tavily_search", serde_json::json!({"query": "Leo Messi"})),
            ],
            vec![text("Leo Messi is a footballer.")],
            vec![tool_use(
                "sr",
                STRUCTURED_RESPONSE_TOOL,
                serde_json::json!({
                    "status": "completed",
                    "task_description": "Leo Messi",
                    "task_output": "Leo Messi is a footballer."
                }),
            )],
        ]);
        let agent = search_agent(provider.clone());

        let events: Vec<AgentEvent> = collect(agent.stream("Who is Leo Messi?", "ctx-1"))
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            AgentEvent::Message {
                content: "Searching.".to_string()
            }
        );
        assert!(matches!(&events[1], AgentEvent::ToolCall { tool_call_name, .. } if tool_call_name == "tavily_search"));
        assert!(
            matches!(&events[2], AgentEvent::ToolCallResult { tool_call_result, .. } if tool_call_result["results"][0]["title"] == "Lionel Messi")
        );
        assert_eq!(
            events[4],
            AgentEvent::Response(AgentResponse::completed(
                "Leo Messi".to_string(),
                "Leo Messi is a footballer.".to_string()
            ))
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].system.as_deref(), Some(SYSTEM_INSTRUCTION));
        assert_eq!(requests[0].model, "mock-model");
        assert_eq!(requests[2].system.as_deref(), Some(RESPONSE_FORMAT_INSTRUCTION));
        assert_eq!(
            requests[2].tool_choice,
            Some(ToolChoice::Tool(STRUCTURED_RESPONSE_TOOL.to_string()))
        );
        // Second call sees the tool result
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].messages[2].role, Role::User);
    }

    #[tokio::test]
    async fn test_missing_structured_response_requires_input() {
        let provider = ScriptedProvider::new(vec![
            vec![text("Could you be more specific?")],
            vec![text("no tool call here")],
        ]);
        let agent = search_agent(provider);

        let events = collect(agent.stream("something", "ctx-1")).await;
        let last = events.last().unwrap().as_ref().unwrap();
        assert_eq!(*last, AgentEvent::Response(AgentResponse::input_required()));
    }

    #[tokio::test]
    async fn test_thread_memory_is_reused() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let structured = |status: &str| {
            vec![tool_use(
                "sr",
                STRUCTURED_RESPONSE_TOOL,
                serde_json::json!({"status": status}),
            )]
        };
        let provider = ScriptedProvider::new(vec![
            vec![text("Which Messi?")],
            structured("input_required"),
            vec![text("Got it.")],
            structured("error"),
        ]);
        let agent = search_agent(provider.clone()).with_checkpointer(checkpointer.clone());

        collect(agent.stream("Messi", "ctx-7")).await;
        collect(agent.stream("The footballer", "ctx-7")).await;

        let requests = provider.requests();
        // human, ai, human
        assert_eq!(requests[2].messages.len(), 3);

        let state = checkpointer.load("ctx-7").await.unwrap();
        assert_eq!(state.messages.len(), 4);
        assert_eq!(
            state.structured_response.map(|r| r.status),
            Some(StructuredStatus::Error)
        );
    }

    #[tokio::test]
    async fn test_provider_failure_ends_stream_with_error() {
        let provider = ScriptedProvider::new(vec![]);
        let agent = search_agent(provider);

        let events = collect(agent.stream("q", "ctx-1")).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(AgentError::Provider(_))));
    }

    #[tokio::test]
    async fn test_failed_run_keeps_partial_thread() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        // One search round, then the provider has nothing left to say
        let provider = ScriptedProvider::new(vec![vec![tool_use(
            "call_1",
            "tavily_search",
            serde_json::json!({"query": "Leo Messi"}),
        )]]);
        let agent = search_agent(provider).with_checkpointer(checkpointer.clone());

        let events = collect(agent.stream("Who is Leo Messi?", "ctx-9")).await;
        assert!(matches!(events.last(), Some(Err(AgentError::Provider(_)))));

        let state = checkpointer.load("ctx-9").await.unwrap();
        // human, ai tool call, tool result
        assert_eq!(state.messages.len(), 3);
        assert!(matches!(&state.messages[0], AgentMessage::Human { content, .. } if content == "Who is Leo Messi?"));
        assert!(matches!(&state.messages[2], AgentMessage::Tool { tool_call_id, .. } if tool_call_id == "call_1"));
        assert!(state.structured_response.is_none());
    }

    #[tokio::test]
    async fn test_iteration_cap_still_requests_structured_response() {
        let search = || {
            vec![tool_use(
                "call",
                "tavily_search",
                serde_json::json!({"query": "again"}),
            )]
        };
        let provider = ScriptedProvider::new(vec![
            search(),
            search(),
            vec![tool_use(
                "sr",
                STRUCTURED_RESPONSE_TOOL,
                serde_json::json!({"status": "input_required"}),
            )],
        ]);
        let agent = search_agent(provider.clone()).with_max_iterations(2);

        let events = collect(agent.stream("q", "ctx-1")).await;
        assert!(matches!(
            events.last(),
            Some(Ok(AgentEvent::Response(r))) if r.require_user_input
        ));
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let provider = ScriptedProvider::new(vec![
            vec![tool_use("c1", "missing_tool", serde_json::json!({}))],
            vec![text("Sorry.")],
            vec![tool_use(
                "sr",
                STRUCTURED_RESPONSE_TOOL,
                serde_json::json!({"status": "error"}),
            )],
        ]);
        let agent = search_agent(provider.clone());

        let events: Vec<AgentEvent> = collect(agent.stream("q", "ctx-1"))
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();
        // Non-JSON error text produces no tool_call_result event
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, AgentEvent::ToolCallResult { .. }))
        );

        let requests = provider.requests();
        assert!(matches!(
            &requests[1].messages[2].content[0],
            ContentBlock::ToolResult { is_error: Some(true), content, .. } if content.starts_with("Error: Tool not found")
        ));
    }
}
