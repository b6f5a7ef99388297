use anyhow::Result;
use dotenv::dotenv;
use fixture_match_scraper::alias::AliasMap;
use fixture_match_scraper::score_reconciler::ScoreReconciler;
use fixture_match_scraper::store::{load_result_batches, JsonMatchStore};
use fixture_match_scraper::ScraperConfig;
use tracing::info;
use tracing_subscriber;

fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt::init();

    let config = ScraperConfig::from_env();
    let aliases = AliasMap::load(config.paths.alias_table.as_deref())?;

    info!("Starting match score update process...");
    let mut store = JsonMatchStore::load(&config.paths.matches_file)?;
    let batches: Vec<_> = load_result_batches(&config.paths.results_dir)?
        .into_iter()
        .map(|(path, matches)| {
            info!("Loaded {} matches from {:?}", matches.len(), path);
            matches
        })
        .collect();

    let reconciliation = ScoreReconciler::new(&aliases).reconcile(store.matches(), &batches);
    if reconciliation.updates.is_empty() {
        info!("No scores to update");
    } else {
        let applied = store.apply_updates(&reconciliation.updates);
        store.save()?;
        info!("Saved {} score updates to {:?}", applied, store.path());
    }

    info!("Match score update process complete");
    Ok(())
}
