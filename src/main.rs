//! Medic CLI binary entry point.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use medic::agent_loop::{DiagnosticContext, RunDriver, RunEvent, RunEventSink, RunOutcome};
use medic::cli::console::{render, ControlLine};
use medic::cli::{Cli, Commands, DiagnoseArgs};
use medic::provider::OpenAiProvider;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MEDIC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Diagnose(args) => handle_diagnose(args).await,
    };

    match result {
        Ok(RunOutcome::Failed) => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn handle_diagnose(args: DiagnoseArgs) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    let config = args.load_config()?;
    let error_text = args.error_text().await?;
    let mut context = DiagnosticContext::new(error_text, args.project_dir()?);
    if let Some(history) = &args.history {
        context = context.with_command_history(history.clone());
    }

    let provider = Arc::new(OpenAiProvider::from_config(&config.agent));
    let sink: RunEventSink = Arc::new(|event: RunEvent| {
        if let Some(text) = render(&event) {
            println!("{text}");
        }
    });
    let driver = RunDriver::from_config(&config, provider, Some(sink));
    let control = driver.control();

    let input = tokio::spawn(async move {
        let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
        while let Some(Ok(line)) = lines.next().await {
            let command = ControlLine::parse(&line);
            if command != ControlLine::Empty && !command.clone().apply(&control) {
                eprintln!("(ignored: the run is not in a state that accepts that)");
            }
        }
    });

    let result = driver.run(context).await;
    input.abort();

    if let Some(error) = &result.error {
        eprintln!("Run failed: {error}");
    }
    Ok(result.outcome)
}
