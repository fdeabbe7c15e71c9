//! Prompt text for the search agent.

/// System prompt for every reasoning turn.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that can search the web with the Tavily API and answer questions about the results. \
If the `tavily_search` tool returns insufficient results, you should explain that to the user and ask them to try again with a more specific query. \
You can use markdown format to format your responses.";

/// System prompt for the final structured-response call.
pub const RESPONSE_FORMAT_INSTRUCTION: &str = "`status` should be 'completed' if the request is complete. \
The request is complete if the `tavily_search` tool has been called and the results are sufficient to answer the user's question. \
If `status` is 'completed', `task_description` should be the exact search query that was used to get the results and `task_output` should be the output of the task. \
`task_output` supports markdown format. \
`status` should be 'input_required' if input is required from the user. \
Input is required if the `tavily_search` tool has been called and the results are insufficient to answer the user's question. \
`status` should be 'error' if an error has occurred.";

/// Name of the synthetic tool used to force the structured response.
pub const STRUCTURED_RESPONSE_TOOL: &str = "structured_response";
