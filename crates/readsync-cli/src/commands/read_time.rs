use clap::Args;
use serde::Serialize;

use readsync_core::{
    sync_daily, update_heatmap, Config, DaySyncSummary, HeatmapOutcome, NotionStore, RunKind,
    ShelfClock, WeReadClient,
};

#[derive(Args)]
pub struct ReadTimeArgs {
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ReadTimeReport {
    heatmap: HeatmapOutcome,
    days: DaySyncSummary,
}

pub fn run(config: &Config, args: ReadTimeArgs) -> Result<(), Box<dyn std::error::Error>> {
    config.validate(RunKind::ReadTime)?;
    let clock = ShelfClock::from_hours(config.timezone_offset_hours);

    let source = WeReadClient::new(&config.weread)?;
    let mut store = NotionStore::new(&config.notion, clock)?;

    let heatmap = update_heatmap(
        &mut store,
        &config.heatmap,
        config.notion.heatmap_block_id.as_deref(),
    )?;
    let days = sync_daily(&source, &mut store, &config.shelf_name, clock.today())?;

    let report = ReadTimeReport { heatmap, days };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &report.heatmap {
            HeatmapOutcome::Updated { url } => println!("heatmap: {url}"),
            HeatmapOutcome::NoBlock { .. } => println!("heatmap: no block configured"),
            HeatmapOutcome::NoImage => println!("heatmap: no image found"),
            HeatmapOutcome::NoRepository => println!("heatmap: repository not set"),
        }
        println!("{}", report.days);
    }
    Ok(())
}
