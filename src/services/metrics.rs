use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge};
use tracing::{info, warn};

use crate::{
    db::{self, Collection, DocumentStore},
    models::company::{Building, Company},
};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref FANOUT_RUNS_COUNTER: Counter = register_counter!(
        "menufan_fanout_runs_total",
        "Fan-out runs started"
    ).unwrap();

    pub static ref COMPANY_MENUS_COUNTER: Counter = register_counter!(
        "menufan_company_menus_generated_total",
        "Company menus persisted by fan-out"
    ).unwrap();

    pub static ref SKIPPED_BUILDINGS_COUNTER: CounterVec = register_counter_vec!(
        "menufan_buildings_skipped_total",
        "Buildings skipped by fan-out, by missing structure",
        &["missing"]
    ).unwrap();

    pub static ref WRITE_FAILURES_COUNTER: CounterVec = register_counter_vec!(
        "menufan_write_failures_total",
        "Per-building writes rejected by the document store",
        &["operation"]
    ).unwrap();

    pub static ref STRUCTURES_COPIED_COUNTER: CounterVec = register_counter_vec!(
        "menufan_structures_copied_total",
        "Buildings receiving a copied structure pair, by action",
        &["action"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref COMPANIES_GAUGE: Gauge = register_gauge!(
        "menufan_companies_active_total",
        "Active companies"
    ).unwrap();

    pub static ref BUILDINGS_GAUGE: Gauge = register_gauge!(
        "menufan_buildings_active_total",
        "Active buildings"
    ).unwrap();

    pub static ref COMPANY_MENUS_GAUGE: Gauge = register_gauge!(
        "menufan_company_menus_total",
        "Generated company menus currently stored"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start<S: DocumentStore>(store: S) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = collect(&store).await {
                warn!("Metrics: collection failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
        }
    });
}

async fn collect<S: DocumentStore>(store: &S) -> anyhow::Result<()> {
    let companies: Vec<Company> = db::fetch_all(store, Collection::Companies).await?;
    let buildings: Vec<Building> = db::fetch_all(store, Collection::Buildings).await?;
    let menus = store.list(Collection::CompanyMenus).await?;

    COMPANIES_GAUGE.set(companies.iter().filter(|c| c.status.is_active()).count() as f64);
    BUILDINGS_GAUGE.set(buildings.iter().filter(|b| b.status.is_active()).count() as f64);
    COMPANY_MENUS_GAUGE.set(menus.len() as f64);

    info!("Metrics: collected for {} company(ies)", companies.len());
    Ok(())
}
