//! Chatbot server binary.
//! Run with: cargo run --bin llmedicare-server

use std::process::ExitCode;

use llmedicare_agent::start_assistant;

fn main() -> ExitCode {
    start_assistant::run()
}
