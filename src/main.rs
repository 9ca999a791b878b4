//! SSL Control Core
//!
//! Runs the executor pool against a replayed vision log or the live
//! vision / referee feed. `--dump` prints a summary of the configured log
//! and exits; `--dry-run` keeps commands in memory instead of sending them.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ssl_core::{
    Config, Point, TEAM_SIZE, VERSION,
    executor::{ExecutorPool, GotoPosition, ShootAtGoal, TickSource},
    network::{CommandSink, MemorySink, UdpTransport, VisionReceiver},
    planner::MovementPlanner,
    vision::{LogReader, LogReaderConfig, Replayer},
    world::{Field, TeamColor, WorldModel, WorldSnapshot, WorldStore},
};

/// Keeper stands this fraction of the way from its goal to the center spot.
const KEEPER_ADVANCE: f64 = 0.05;

enum Feed {
    Replay(Replayer),
    Live(VisionReceiver),
}

#[derive(Serialize)]
struct LogSummary {
    path: String,
    sha256: String,
    records: u64,
    frames: usize,
    duration_ms: i64,
    field: Option<Field>,
    blue_goals: Vec<i64>,
    yellow_goals: Vec<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = Config::from_env();
    config.validate()?;

    info!("SSL Control Core v{}", VERSION);
    info!("Tick interval: {} ms", config.tick_interval_ms);
    info!("Playing {:?} on the {:?} side", config.ally_color, config.ally_side);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--dump") {
        let Some(path) = &config.log_path else {
            bail!("--dump needs SSL_LOG_PATH");
        };
        return dump(path, &config);
    }

    if args.iter().any(|a| a == "--dry-run") {
        let sink = Arc::new(MemorySink::new());
        run(&config, sink.clone()).await?;
        info!("Dry run produced {} commands", sink.sent().await.len());
    } else {
        let transport = Arc::new(UdpTransport::bind(&config).await?);
        let result = run(&config, transport.clone()).await;
        if let Err(e) = transport.broadcast_stop().await {
            warn!("Final stop broadcast failed: {}", e);
        }
        result?;
    }
    Ok(())
}

/// Print a JSON summary of a vision log.
fn dump(path: &Path, config: &Config) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let reader = LogReader::from_bytes(&bytes, LogReaderConfig::from(config))?;

    let summary = LogSummary {
        path: path.display().to_string(),
        sha256: hex::encode(Sha256::digest(&bytes)),
        records: reader.records(),
        frames: reader.len(),
        duration_ms: reader.duration_ms(),
        field: reader.field(),
        blue_goals: reader.goal_times(TeamColor::Blue).to_vec(),
        yellow_goals: reader.goal_times(TeamColor::Yellow).to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Drive every ally robot until the feed ends or Ctrl-C.
async fn run<S: CommandSink>(config: &Config, sink: Arc<S>) -> Result<()> {
    let store = Arc::new(WorldStore::new(WorldSnapshot::new(config.ally_color, config.ally_side)));
    let mut model = WorldModel::new(config.ally_color, config.ally_side, store.clone());
    let pool = ExecutorPool::new(store.clone(), sink, TickSource::Interval(config.tick_interval()))?;

    let own_goal = store.current().own_goal();
    for id in 0..TEAM_SIZE {
        let planner = MovementPlanner::from_config(config);
        if id == config.keeper_id {
            let guard = own_goal.center().lerp(Point::ZERO, KEEPER_ADVANCE);
            pool.assign(id, GotoPosition::new(Some(guard), Some(Point::ZERO)).with_planner(planner))
                .await?;
        } else {
            pool.assign(id, ShootAtGoal::default().with_planner(planner)).await?;
        }
    }

    let (shutdown_tx, _) = broadcast::channel(1);
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            let _ = ctrl_c_tx.send(());
        }
    });

    let feed = match &config.log_path {
        Some(path) => Feed::Replay(Replayer::new(&LogReader::open(path, LogReaderConfig::from(config))?)),
        None => Feed::Live(VisionReceiver::bind(config).await?),
    };

    pool.start_all().await;

    let fed = match feed {
        Feed::Replay(replayer) => replayer
            .run(&mut model, shutdown_tx.subscribe())
            .await
            .map(|frames| frames as u64),
        Feed::Live(receiver) => receiver.run(&mut model, shutdown_tx.subscribe()).await,
    };

    pool.stop_all().await;
    for status in pool.status().await {
        info!(
            "Robot {}: {} ticks, last command {:?}",
            status.robot_id, status.ticks, status.last_command
        );
    }

    let published = fed?;
    info!("Published {} snapshots", published);
    Ok(())
}
