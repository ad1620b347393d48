use anyhow::Result;

use crate::config::MemelordConfig;

/// Display memory statistics in the terminal.
pub fn stats(config: &MemelordConfig) -> Result<()> {
    let mut store = super::open_store(config)?;
    let response = store.stats()?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", response.total_memories);
    println!("  Tasks recorded:      {}", response.task_count);
    println!("  Avg task score:      {:.3}", response.avg_task_score);
    println!();

    if response.top_memories.is_empty() {
        println!("No memories stored yet.");
        return Ok(());
    }

    println!("Top memories by weight:");
    for memory in &response.top_memories {
        let preview: String = memory.content.chars().take(60).collect();
        println!(
            "  [{:.2}] ({}) {} {}",
            memory.weight, memory.category, memory.id, preview
        );
    }

    Ok(())
}

/// Display the `n` highest-weighted memories.
pub fn top(config: &MemelordConfig, n: usize) -> Result<()> {
    let mut store = super::open_store(config)?;
    let memories = store.top_by_weight(n)?;

    if memories.is_empty() {
        println!("No memories stored yet.");
        return Ok(());
    }

    for memory in &memories {
        println!("[{:.2}] ({}) {}", memory.weight, memory.category, memory.id);
        println!("  {}", memory.content.replace('\n', "\n  "));
    }

    Ok(())
}
