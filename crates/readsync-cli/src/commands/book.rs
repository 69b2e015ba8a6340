use clap::Args;
use readsync_core::{BookReconciler, Config, NeoDbCatalog, NotionStore, RunKind, ShelfClock, WeReadClient};

#[derive(Args)]
pub struct BookArgs {
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(config: &Config, args: BookArgs) -> Result<(), Box<dyn std::error::Error>> {
    config.validate(RunKind::Books)?;
    let clock = ShelfClock::from_hours(config.timezone_offset_hours);

    let source = WeReadClient::new(&config.weread)?;
    let mut store = NotionStore::new(&config.notion, clock)?;
    let catalog = NeoDbCatalog::new(&config.catalog)?;

    let summary =
        BookReconciler::new(&source, &mut store, &catalog, clock).run(&config.shelf_name)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}
