use coin_catalog_sdk::{CatalogError, CoinCatalog, EngineConfig, Resolution};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = CoinCatalog::new(EngineConfig::from_env())?;

    println!("Coin Catalog (provider: {})", catalog.provider_name());
    println!("==================================");

    // 1. First page of the listing
    let listing = catalog.listing_page();
    match listing.list_page(1).await {
        Ok(Resolution::Applied(Ok(snapshot))) => {
            for entry in &snapshot.entries {
                println!(
                    "{:>4} {:<8} {:<20} {:>14}",
                    entry
                        .market_cap_rank
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    entry.display_symbol(),
                    entry.name,
                    entry.format_price()
                );
            }
            println!("Next page available: {}", listing.can_go_next().await);
        }
        Ok(Resolution::Applied(Err(e))) => eprintln!("Listing failed: {}", e),
        Ok(Resolution::Discarded) => {}
        Err(boundary) => eprintln!("Cannot load page: {}", boundary),
    }

    // 2. Fuzzy search over the top coins
    println!("\nSearch \"bitcoin\"");
    println!("{:-<50}", "");
    let search = catalog.search_page();
    if let Resolution::Applied(Err(e)) = search.load().await {
        eprintln!("Search snapshot failed: {}", e);
    }
    let results = search.search("bitcoin").await;
    for entry in &results {
        println!("{:<8} {}", entry.display_symbol(), entry.name);
    }

    // 3. Toggle the best match as a favorite
    let mut favorites = catalog.favorites();
    if let Some(best) = results.first() {
        match favorites.toggle_favorite(best) {
            Ok(true) => println!("\nAdded {} to favorites", best.name),
            Ok(false) => println!("\nRemoved {} from favorites", best.name),
            Err(CatalogError::PersistFailed(e)) => {
                eprintln!("\nFavorite kept for this session only: {}", e)
            }
            Err(e) => eprintln!("\nFavorite failed: {}", e),
        }
    }
    println!("Favorites: {:?}", favorites.favorites().ids());

    // 4. Detail with a 7 day chart
    let detail = catalog.detail_page();
    match detail.get_detail("bitcoin").await {
        Resolution::Applied(Ok(detail)) => {
            println!("\n{} ({})", detail.entry.name, detail.entry.display_symbol());
            println!("   Price:        {}", detail.entry.format_price());
            println!("   Total supply: {}", detail.entry.format_total_supply());
            if let Some(chart) = detail.history.chart() {
                println!("   {}", chart.label);
                for (label, value) in chart.labels.iter().zip(&chart.values) {
                    println!("   {}  ${:.2}", label, value);
                }
            }
        }
        Resolution::Applied(Err(e)) => eprintln!("\nDetail failed: {}", e),
        Resolution::Discarded => {}
    }

    Ok(())
}
