use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    syllabus_cli::run().await
}
