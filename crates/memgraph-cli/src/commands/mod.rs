pub mod chat;
pub mod config;
pub mod replay;

pub use chat::ChatCommand;
pub use config::ConfigCommand;
pub use replay::ReplayCommand;

use memgraph::{MemoryEngine, Role};

use crate::error::CliResult;

/// Demo facts loaded by `--seed`, each with the entities it mentions
pub const SEED_TURNS: &[(&str, &[&str])] = &[
    ("My name is Priranshu.", &["Priranshu"]),
    (
        "I am participating in an IIT Guwahati Hackathon.",
        &["IIT Guwahati", "Hackathon"],
    ),
    (
        "I need a memory system that scales to 1,000 turns.",
        &["Memory System"],
    ),
];

/// Ingest the demo facts as user turns, without generating replies
pub async fn seed(engine: &mut MemoryEngine) -> CliResult<()> {
    for (content, entities) in SEED_TURNS {
        let entities: Vec<String> = entities.iter().map(|e| e.to_string()).collect();
        engine.ingest(content, Role::User, &entities).await?;
    }
    tracing::info!(records = SEED_TURNS.len(), "Seeded demo memories");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memgraph::config::Config;
    use memgraph::{Collaborators, MemoryTier};

    #[tokio::test]
    async fn test_seed_populates_tiers_and_graph() {
        let mut engine = MemoryEngine::new(Config::default(), Collaborators::local(32)).unwrap();

        seed(&mut engine).await.unwrap();

        let stats = engine.stats();
        assert_eq!(stats.l1_fast, 1);
        assert_eq!(stats.l2_recent, 2);
        assert_eq!(stats.l4_entities, 4);
        assert_eq!(engine.related_entities("IIT Guwahati"), vec!["hackathon"]);
        assert_eq!(engine.records(MemoryTier::L1Fast)[0].content, "My name is Priranshu.");
    }
}
