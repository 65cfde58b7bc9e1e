use chrono::Utc;

use stockledger_app::App;
use stockledger_infra::InventoryConfig;

fn main() -> anyhow::Result<()> {
    let config = InventoryConfig::from_env();
    stockledger_observability::init_with(&config.log_filter, config.log_json);

    let app = App::bootstrap(config, Utc::now())?;
    let snapshot = app.snapshot()?;

    tracing::info!(
        products = snapshot.stats.total_products,
        low_stock = snapshot.low_stock.len(),
        out_of_stock = snapshot.out_of_stock.len(),
        "inventory loaded"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
