use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memgraph::{EngineStats, MemoryEngine, MemoryTier, TurnReport};

use crate::error::CliResult;

#[derive(Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().copied());
    table
}

pub fn print_turn(report: &TurnReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        OutputFormat::Table => {
            println!("assistant> {}", report.reply);
            if let Some(reason) = &report.degraded {
                println!("  (degraded: {reason})");
            }
            let source = if report.cache_hit { "fast cache" } else { "ranked" };
            println!(
                "  turn {} | {} memories ({source}) | {} ms",
                report.turn,
                report.active_memories.len(),
                report.latency_ms
            );
            for memory in &report.active_memories {
                println!(
                    "    [{}] {:.2} {}",
                    memory.tier,
                    memory.score,
                    truncate_string(&memory.content, 60)
                );
            }
        }
    }
    Ok(())
}

pub fn print_stats(stats: &EngineStats, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
        OutputFormat::Table => {
            println!("MemGraph Statistics");
            println!("===================\n");

            let mut table = new_table(&["Tier", "Count"]);
            table.add_row([MemoryTier::L1Fast.as_str(), &stats.l1_fast.to_string()]);
            table.add_row([MemoryTier::L2Recent.as_str(), &stats.l2_recent.to_string()]);
            table.add_row([
                MemoryTier::L3Consolidated.as_str(),
                &stats.l3_consolidated.to_string(),
            ]);
            table.add_row([
                MemoryTier::L4Graph.as_str(),
                &format!("{} entities, {} links", stats.l4_entities, stats.l4_links),
            ]);
            println!("{table}\n");

            let latency = stats
                .last_latency_ms
                .map(|ms| format!("{ms} ms"))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "Turn: {} | Cache hits: {} | Last latency: {}",
                stats.turn, stats.cache_hits, latency
            );
        }
    }
    Ok(())
}

/// Every record held in L1 to L3, tier by tier
pub fn print_memories(engine: &MemoryEngine, format: OutputFormat) -> CliResult<()> {
    let tiers = [
        MemoryTier::L1Fast,
        MemoryTier::L2Recent,
        MemoryTier::L3Consolidated,
    ];

    match format {
        OutputFormat::Json => {
            let mut output = serde_json::Map::new();
            for tier in tiers {
                let views: Vec<_> = engine.records(tier).iter().map(|r| r.to_view()).collect();
                output.insert(tier.as_str().to_string(), serde_json::to_value(views)?);
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let mut table = new_table(&["ID", "Tier", "Role", "Score", "Hits", "Last Access", "Content"]);
            for tier in tiers {
                for record in engine.records(tier) {
                    table.add_row([
                        record.short_code(),
                        tier.as_str().to_string(),
                        record.role.as_str().to_string(),
                        format!("{:.2}", record.relevance_score),
                        record.access_count.to_string(),
                        format_timestamp(&record.last_accessed_at),
                        truncate_string(&record.content, 50),
                    ]);
                }
            }
            println!("{table}");
        }
    }
    Ok(())
}
