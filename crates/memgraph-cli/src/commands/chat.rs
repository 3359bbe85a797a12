use std::io::Write;

use clap::Parser;
use memgraph::{Config, MaintenanceReport, MemoryEngine, TurnRunner};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::seed;
use crate::error::CliResult;
use crate::output::{OutputFormat, print_memories, print_stats, print_turn};

#[derive(Parser)]
pub struct ChatCommand {
    #[clap(long, help = "Load demo memories before the first turn")]
    pub seed: bool,
}

/// What the REPL should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Continue,
    Quit,
}

impl ChatCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> CliResult<()> {
        let mut engine = MemoryEngine::from_config(config)?;
        if self.seed {
            seed(&mut engine).await?;
        }
        let runner = TurnRunner::for_engine(&engine);

        if let OutputFormat::Table = format {
            println!("MemGraph chat. Commands: /stats /memories /maintain /reset /quit");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        prompt(format)?;
        while let Some(line) = lines.next_line().await? {
            if handle_line(&mut engine, &runner, &line, format).await? == ChatAction::Quit {
                break;
            }
            prompt(format)?;
        }

        Ok(())
    }
}

fn prompt(format: OutputFormat) -> CliResult<()> {
    if let OutputFormat::Table = format {
        print!("you> ");
        std::io::stdout().flush()?;
    }
    Ok(())
}

/// Run one REPL line: a slash command or a conversational turn.
///
/// Turn failures are reported and the session continues.
pub async fn handle_line(
    engine: &mut MemoryEngine,
    runner: &TurnRunner,
    line: &str,
    format: OutputFormat,
) -> CliResult<ChatAction> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ChatAction::Continue);
    }

    match line {
        "/quit" | "/exit" => return Ok(ChatAction::Quit),
        "/stats" => print_stats(&engine.stats(), format)?,
        "/memories" => print_memories(engine, format)?,
        "/maintain" => {
            let report = engine.run_maintenance().await?;
            print_maintenance(&report, format)?;
        }
        "/reset" => {
            engine.reset();
            println!("Memory cleared.");
        }
        command if command.starts_with('/') => {
            println!("Unknown command: {command}");
        }
        message => match runner.run(engine, message).await {
            Ok(report) => print_turn(&report, format)?,
            Err(e) => eprintln!("Error: {e}"),
        },
    }

    Ok(ChatAction::Continue)
}

fn print_maintenance(report: &MaintenanceReport, format: OutputFormat) -> CliResult<()> {
    let summary = report.consolidation.as_ref().map(|c| c.summary_id);
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "pruned": report.prune.pruned,
                "consolidated_into": summary,
            });
            println!("{}", serde_json::to_string(&output)?);
        }
        OutputFormat::Table => {
            println!(
                "Maintenance: decayed {}, pruned {}, {}",
                report.prune.decayed,
                report.prune.pruned.len(),
                match summary {
                    Some(id) => format!("consolidated into {id}"),
                    None => "nothing to consolidate".to_string(),
                }
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memgraph::Collaborators;

    fn create_test_engine() -> MemoryEngine {
        MemoryEngine::new(Config::default(), Collaborators::local(32)).unwrap()
    }

    #[tokio::test]
    async fn test_handle_line_runs_turns_and_commands() {
        let mut engine = create_test_engine();
        let runner = TurnRunner::for_engine(&engine);
        let format = OutputFormat::Json;

        for line in ["My name is Ada.", "", "/stats", "/memories", "/maintain", "/bogus"] {
            let action = handle_line(&mut engine, &runner, line, format).await.unwrap();
            assert_eq!(action, ChatAction::Continue);
        }
        assert_eq!(engine.turn(), 1);

        let action = handle_line(&mut engine, &runner, "/reset", format).await.unwrap();
        assert_eq!(action, ChatAction::Continue);
        assert_eq!(engine.turn(), 0);
        assert_eq!(engine.stats().l1_fast, 0);

        let action = handle_line(&mut engine, &runner, " /quit ", format).await.unwrap();
        assert_eq!(action, ChatAction::Quit);
    }
}
