use anyhow::Context;
use clap::Parser;
use exam_scheduler::config::{Cli, Command};
use exam_scheduler::server::{self, AppState};
use exam_scheduler::store::MemoryStore;
use exam_scheduler::ScheduleInput;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

fn read_input(path: Option<&Path>) -> anyhow::Result<ScheduleInput> {
    let input: ScheduleInput = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => serde_json::from_reader(io::stdin().lock())
            .context("failed to parse schedule input from stdin")?,
    };
    Ok(input)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.settings.log_filter.as_str()),
    )
    .init();

    let scheduler = cli.settings.scheduler();
    log::debug!("Using {:?}", scheduler);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = AppState::new(Arc::new(MemoryStore::new()), scheduler);
            server::run_server(cli.settings.bind, state)
                .await
                .with_context(|| format!("failed to serve on {}", cli.settings.bind))?;
        }
        Command::Solve { input } => {
            let input = read_input(input.as_deref())?;
            let report = scheduler.run(&input)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            eprintln!("{} of {} exams scheduled", report.scheduled_count(), report.total());
        }
    }

    Ok(())
}
