//! Headless live-map monitor.
//!
//! Composition root for the admin core: loads config, builds the backend
//! and realtime clients, starts the live map session, and logs a summary
//! of every scene update until Ctrl-C. Useful for watching a deployment's
//! change feed without the dashboard in front of it.

use std::sync::Arc;

use civiops::backend::{BackendClient, RealtimeClient};
use civiops::config;
use civiops::livemap::{BackendSnapshots, LiveMap};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("civiops: {}", e);
            std::process::exit(1);
        }
    };

    let client = match BackendClient::new(&config.backend) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("civiops: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Map viewport: center ({}, {}), zoom {}",
        config.map.center_lat,
        config.map.center_lng,
        config.map.zoom
    );

    let source = Arc::new(BackendSnapshots::new(client.clone()));
    let mut live = LiveMap::start(source).await;

    // Keep the realtime client alive for the whole session; dropping it
    // tears the socket down.
    let _realtime = if config.realtime.enabled {
        let realtime = RealtimeClient::start(client.base_url(), client.key(), &config.realtime);
        live.watch_changes(&realtime);
        Some(realtime)
    } else {
        log::warn!("Realtime disabled; the map will not follow backend changes");
        None
    };

    run_monitor(live).await;
    log::info!("Shutting down");
}

async fn run_monitor(live: LiveMap) {
    let mut scenes = live.scenes();
    log_scene(&live);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = scenes.changed() => {
                if changed.is_err() {
                    break;
                }
                log_scene(&live);
            }
        }
    }
}

fn log_scene(live: &LiveMap) {
    let scene = live.scene();
    log::info!(
        "Scene: {} issue markers ({:?}), {} heat points, {} workers ({} active), {} open / {} in progress",
        scene.issues.len(),
        scene.filter,
        scene.heat.points.len(),
        scene.workers.len(),
        scene.stats.active_workers,
        scene.stats.open_issues,
        scene.stats.in_progress,
    );
}
