pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use syllabus_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "syllabus",
    about = "Syllabus course-advisor CLI",
    long_about = "Run course-advisor turns against the demo catalog, stream per-node \
                  progress, and inspect effective configuration.",
    after_help = "Examples:\n  syllabus ask \"show me AI courses\"\n  syllabus ask --student 7 \"enroll me in Docker Mastery\"\n  syllabus config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a syllabus.toml config file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one conversation turn and print the response with suggestions")]
    Ask {
        message: String,
        #[arg(long, help = "Model identifier, e.g. gpt-4o-mini or offline")]
        model: Option<String>,
        #[arg(long, help = "Student identifier enabling enrollment and history")]
        student: Option<i64>,
        #[arg(long, default_value = "cli", help = "Conversation thread key")]
        thread: String,
        #[arg(long, help = "Stream per-node progress events as JSON lines")]
        stream: bool,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
}

fn init_logging(config: &AppConfig) {
    use syllabus_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("config error: {error}");
            return ExitCode::from(2);
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Command::Ask { message, model, student, thread, stream } => {
            commands::ask::run(&config, commands::ask::AskArgs {
                message,
                model,
                student,
                thread,
                stream,
            })
            .await
        }
        Command::Config => commands::config::run(&config),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
