use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use camp_placement::cli;
use camp_placement::report::{self, PlacementSummary};
use camp_placement::{Allocator, Catalog, SearchReport};

fn main() -> Result<()> {
    let matches = cli::command().get_matches();

    let Some(invocation) = cli::resolve(&matches)? else {
        cli::command().print_help()?;
        println!();
        return Ok(());
    };
    let config = &invocation.config;

    let level = if invocation.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    println!("📂 Participants: {}", invocation.participants.display());
    println!("📂 Programs: {}", invocation.programs.display());
    println!("📄 Output: {}", invocation.output.display());
    match config.seed {
        Some(seed) => println!("🎲 {} trials, seed {}", config.trials, seed),
        None => println!("🎲 {} trials, unseeded", config.trials),
    }

    let catalog = Catalog::load(
        &invocation.participants,
        &invocation.programs,
        config.duplicate_names,
    )?;
    println!(
        "   ✅ Loaded {} participants and {} programs",
        catalog.participants().len(),
        catalog.programs().len()
    );

    let allocator = Allocator::new(&catalog);
    let search = allocator.search_seeded(config.trials, config.seed)?;

    report::write_placement_csv(&invocation.output, &catalog, &search.best)?;

    let summary = report::summarize(&catalog, &search.best);
    print_summary(&search, &summary);
    println!("\n✅ Placement written to {}", invocation.output.display());
    Ok(())
}

fn print_summary(search: &SearchReport, summary: &PlacementSummary) {
    println!("\n📊 SUMMARY");
    println!("==========\n");

    println!(
        "🏆 Best of {} trials: trial {} (first trial {:.3}, {} improvements)",
        search.trials_run,
        search.best.trial,
        search.first_mean,
        search.improvements.len()
    );
    println!("📈 Average satisfaction: {:.3}", summary.mean_satisfaction);
    println!("   Placed: {} / {}", summary.placed, summary.participants);
    for (rank, count) in summary.by_rank.iter().enumerate() {
        println!("   Choice {}: {}", rank + 1, count);
    }

    println!("\n🏕️  Programs:");
    for (i, program) in summary.programs.iter().enumerate() {
        println!(
            "{}. {} - {}/{} (ages {}-{})",
            i + 1,
            program.name,
            program.filled,
            program.capacity,
            program.age_start,
            program.age_end
        );
    }

    if summary.unplaced.is_empty() {
        println!("\n🎯 Everyone has a program");
    } else {
        println!("\n❌ No fitting program for: {}", summary.unplaced.join(", "));
    }
}
