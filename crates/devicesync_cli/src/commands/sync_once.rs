//! Sync-once command implementation.

use devicesync_engine::{SyncEngine, SyncRoundReport};

/// Runs one sync round per kind and prints what changed.
pub async fn run(engine: &SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Syncing pool {:?} in namespace {:?}",
        engine.config().node_pool,
        engine.config().namespace
    );
    println!();

    let reports = engine.sync_once().await?;
    for report in &reports {
        print_report(report);
    }

    let failed: usize = reports.iter().map(|r| r.failed).sum();
    println!();
    if failed == 0 {
        println!("✓ Sync round completed");
        Ok(())
    } else {
        println!("✗ Sync round completed with {failed} failed writes");
        Err("Sync round had failures".into())
    }
}

fn print_report(report: &SyncRoundReport) {
    println!("{}:", report.kind);
    println!("  Created:    {}", report.created);
    println!("  Deleted:    {}", report.deleted);
    println!("  Updated:    {}", report.updated);
    println!("  Unchanged:  {}", report.unchanged);
    if report.conflicts > 0 {
        println!("  Conflicts:  {}", report.conflicts);
    }
    if report.duplicates > 0 {
        println!("  Duplicates: {}", report.duplicates);
    }
    if report.failed > 0 {
        println!("  Failed:     {}", report.failed);
    }
    println!("  Elapsed:    {:?}", report.elapsed);
}
