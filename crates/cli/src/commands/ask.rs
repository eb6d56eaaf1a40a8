use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio_stream::StreamExt;

use syllabus_agent::runtime::{AgentRuntime, TurnEvent, TurnOutcome, TurnRequest};
use syllabus_core::approval::ApprovalDecision;
use syllabus_core::catalog::{InMemoryCourseStore, StudentId};
use syllabus_core::config::AppConfig;

use super::CommandResult;

#[derive(Debug)]
pub struct AskArgs {
    pub message: String,
    pub model: Option<String>,
    pub student: Option<i64>,
    pub thread: String,
    pub stream: bool,
}

/// Runs one turn against the demo catalog. A turn that suspends at the
/// approval gate prompts on stdin and resumes in the same process.
pub async fn run(config: &AppConfig, args: AskArgs) -> CommandResult {
    let store = Arc::new(InMemoryCourseStore::with_demo_catalog());
    let runtime = AgentRuntime::from_config(config, store);

    let request = TurnRequest {
        message: args.message,
        model_id: args.model.unwrap_or_else(|| config.llm.model.clone()),
        student_id: args.student.map(StudentId),
        thread_key: args.thread.clone(),
    };

    let outcome = if args.stream {
        match streamed_turn(&runtime, request).await {
            Ok(outcome) => outcome,
            Err(message) => return CommandResult::failure(message, 1),
        }
    } else {
        runtime.run_turn(request).await
    };

    let outcome = if outcome.pending_approval {
        resolve_approval(&runtime, &args.thread, outcome).await
    } else {
        outcome
    };

    CommandResult::success(render_outcome(&outcome))
}

/// Drains the event stream, echoing each event as a JSON line on stderr,
/// and resolves to the terminal event: the completed outcome or the turn's
/// error message.
async fn streamed_turn(
    runtime: &AgentRuntime,
    request: TurnRequest,
) -> Result<TurnOutcome, String> {
    let mut events = runtime.run_turn_streaming(request);
    let mut terminal = Err("turn produced no terminal event".to_string());

    while let Some(event) = events.next().await {
        if let Ok(line) = serde_json::to_string(&event) {
            eprintln!("{line}");
        }
        match event {
            TurnEvent::Complete { outcome } => terminal = Ok(outcome),
            TurnEvent::Error { message } => terminal = Err(message),
            TurnEvent::Status { .. } | TurnEvent::NodeUpdate { .. } => {}
        }
    }

    terminal
}

async fn resolve_approval(
    runtime: &AgentRuntime,
    thread: &str,
    outcome: TurnOutcome,
) -> TurnOutcome {
    if let Some(message) = &outcome.approval_message {
        println!("{message}");
    }
    print!("Approve? [y/N] ");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    let approved = io::stdin().lock().read_line(&mut answer).is_ok()
        && matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");

    runtime.resume(thread, ApprovalDecision { approved }).await
}

fn render_outcome(outcome: &TurnOutcome) -> String {
    let mut lines = vec![outcome.response.clone()];

    if !outcome.suggestions.is_empty() {
        lines.push(String::new());
        lines.push("You could ask:".to_string());
        for suggestion in &outcome.suggestions {
            lines.push(format!("  - {suggestion}"));
        }
    }

    lines.join("\n")
}
