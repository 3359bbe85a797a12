use std::path::PathBuf;

use clap::Parser;
use memgraph::{Config, MemoryEngine, TurnReport, TurnRunner};

use crate::commands::seed;
use crate::error::CliResult;
use crate::output::{OutputFormat, print_memories, print_stats, print_turn};

#[derive(Parser)]
pub struct ReplayCommand {
    #[clap(help = "Transcript file with one user message per line")]
    pub file: PathBuf,

    #[clap(long, help = "Load demo memories before replaying")]
    pub seed: bool,
}

impl ReplayCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> CliResult<()> {
        let transcript = tokio::fs::read_to_string(&self.file)
            .await
            .map_err(|e| format!("Failed to read transcript {}: {e}", self.file.display()))?;

        let mut engine = MemoryEngine::from_config(config)?;
        if self.seed {
            seed(&mut engine).await?;
        }

        let reports = replay(&mut engine, &transcript).await?;
        for report in &reports {
            print_turn(report, format)?;
        }

        if let OutputFormat::Table = format {
            println!();
        }
        print_stats(&engine.stats(), format)?;
        print_memories(&engine, format)?;
        Ok(())
    }
}

/// Run every non-empty line of `transcript` as a turn, in order
pub async fn replay(engine: &mut MemoryEngine, transcript: &str) -> CliResult<Vec<TurnReport>> {
    let runner = TurnRunner::for_engine(engine);
    let mut reports = Vec::new();
    for line in transcript.lines().map(str::trim).filter(|l| !l.is_empty()) {
        reports.push(runner.run(engine, line).await?);
    }
    tracing::info!(turns = reports.len(), "Replayed transcript");
    Ok(reports)
}
