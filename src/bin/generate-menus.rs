/// Generate company menus from one combined menu.
/// Usually triggered from the API; this runs the same fan-out from a shell or a cron job.
///
/// Usage: generate-menus <COMBINED_MENU_ID> [--strict]
///   --strict  : require the sub-service to be listed in the service structure too
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use menufan_api::{
    config::Config,
    db::PgDocumentStore,
    services::{
        cache::RunCache,
        fanout::FanOutService,
        projection::{ProjectionOptions, SubServiceMatching},
    },
};

#[derive(Parser)]
#[command(name = "generate-menus", about = "Fan a combined menu out to every active company building")]
struct Args {
    /// Id of the combined menu to generate from
    combined_menu_id: Uuid,

    /// Use strict sub-service matching regardless of SUB_SERVICE_MATCHING
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let store = PgDocumentStore::connect(&config.database_url, 5).await?;
    store.run_migrations().await?;

    let options = if args.strict {
        ProjectionOptions {
            sub_service_matching: SubServiceMatching::Strict,
        }
    } else {
        config.projection_options()
    };

    tracing::info!("Generating company menus for combined menu {}", args.combined_menu_id);
    let cache = RunCache::new(config.cache_ttl());
    let report = FanOutService::run(&store, &cache, args.combined_menu_id, options).await?;

    for skipped in &report.skipped {
        tracing::info!(
            "Skipped building '{}' ({}): no active {}",
            skipped.building_name,
            skipped.building_id,
            skipped.missing
        );
    }
    tracing::info!(
        "Done: {} menu(s) generated, {} building(s) skipped",
        report.generated_count,
        report.skipped_count
    );

    Ok(())
}
