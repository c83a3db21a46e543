//! Binary entrypoint for the chatbot server.

use std::process::ExitCode;

use llmedicare_agent::start_assistant;

/// Load `LLMEDICARE_*` configuration and serve the chat API.
fn main() -> ExitCode {
    start_assistant::run()
}
