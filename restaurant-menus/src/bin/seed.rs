use clap::Parser;
use restaurant_menus::{connect, connect_fresh, database_url, seed::seed};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Creates the restaurant/menu/item tables and loads the fixture rows.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// SQLite database path; defaults to `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Drop and recreate every table before seeding.
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let url = cli.database_url.unwrap_or_else(database_url);

    let mut conn = if cli.reset {
        info!(database_url = %url, "resetting schema");
        connect_fresh(&url)?
    } else {
        connect(&url)?
    };

    let seeded = seed(&mut conn).await?;
    info!(
        database_url = %url,
        restaurants = seeded.restaurants.len(),
        menus = seeded.menus.len(),
        items = seeded.items.len(),
        "seeded database"
    );

    Ok(())
}
