use std::sync::Arc;

use log::{error, info, warn};

use dossier_core::InMemorySideEventSource;
use dossierflow::app::record_demo_comment;
#[cfg(feature = "pg_demo")]
use dossierflow::build_pg_service;
use dossierflow::{build_memory_service, init_logging, run_demo, AppConfig, AppError, Backend,
                  DemoDossier, DemoReport};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(&config);
    info!("dossierflow demo (backend: {:?})", config.backend);

    match run(config.backend).await {
        Ok(report) => print_report(&report),
        Err(e) => {
            error!("demo failed: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(backend: Backend) -> Result<DemoReport, AppError> {
    let demo = DemoDossier::new()?;
    match backend {
        Backend::Memory => {
            let events = Arc::new(InMemorySideEventSource::new());
            record_demo_comment(&events, &demo)?;
            let service = build_memory_service(&demo, events)?;
            run_demo(service, &demo).await
        }
        Backend::Postgres => run_pg(&demo).await,
    }
}

#[cfg(feature = "pg_demo")]
async fn run_pg(demo: &DemoDossier) -> Result<DemoReport, AppError> {
    // Construir el pool bloquea (migraciones incluidas).
    let pool = tokio::task::spawn_blocking(dossier_persistence::build_dev_pool_from_env).await
                                                                                          .map_err(|e| AppError::Config(format!("pool task: {e}")))??;
    let service = build_pg_service(pool, demo)?;
    run_demo(service, demo).await
}

#[cfg(not(feature = "pg_demo"))]
async fn run_pg(_demo: &DemoDossier) -> Result<DemoReport, AppError> {
    warn!("postgres backend requested without the pg_demo feature");
    Err(AppError::Config("compila con --features pg_demo para usar postgres".into()))
}

fn print_report(report: &DemoReport) {
    let s = &report.summary;
    println!("Progreso: {}/{} completados ({}%), {} en curso",
             s.completed, s.total, s.percent, s.in_progress);
    if let Some(kind) = &report.rejected_kind {
        println!("Rechazo esperado al completar Intake sin formulario: {kind}");
    }
    println!("Línea de tiempo: {} grupos, {} eventos", report.timeline_groups, report.timeline_events);
    match serde_json::to_string_pretty(s) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("summary serialization failed: {e}"),
    }
}
