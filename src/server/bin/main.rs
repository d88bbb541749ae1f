use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use tracing::info;

use timeclock::api;
use timeclock::config::ServerSettings;
use timeclock::db;
use timeclock::telemetry::{get_subscriber, init_subscriber, DAEMON_FILTER};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = get_subscriber("timeclock-d", DAEMON_FILTER, std::io::stdout);
    init_subscriber(subscriber)?;

    let settings = ServerSettings::from_env()?;
    let pool = db::setup_pool(&settings.database_url).await?;
    db::setup_db(&pool).await?;
    run(pool, settings.port).await;

    Ok(())
}

async fn run(pool: SqlitePool, port: u16) {
    let routes = api::routes(pool);

    info!(port = port, "serving users gateway");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}
