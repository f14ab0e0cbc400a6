use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::bail;
use clap::Parser;
use metrics::MetricsHandle;
use session::Dashboard;
use sources::{parse_url, snapshot_url, HttpSource};
use tokio::task;
use tracing::{info, Level};
use uuid::Uuid;
use view_ipc::{run_server, ViewRequest, ViewResponse, DEFAULT_SOCKET_PATH};

mod handler;

use handler::ViewService;

#[derive(Parser, Debug)]
struct Args {
    #[arg(
        long,
        env = "SNAPSHOT_BASE_URL",
        default_value = "https://mefoundation.com/api/trpc/staking.getStakerSnapshot"
    )]
    snapshot_base_url: String,

    #[arg(
        long,
        env = "SNAPSHOT_TOKEN",
        default_value = "MEFNBXixkEbait3xn9bkm8WsJzXtVsaJEn4c8Sam21u"
    )]
    snapshot_token: String,

    #[arg(
        long,
        env = "SNAPSHOT_NS",
        default_value = "acAvyneD7adS3yrXUp41c1AuoYoYRhnjeAWH9stbdTf"
    )]
    snapshot_ns: String,

    #[arg(
        long,
        env = "HISTORY_URL",
        default_value = "https://me-stake-backend.onrender.com/staking"
    )]
    history_url: String,

    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = session::DEFAULT_POLL_INTERVAL.as_secs()
    )]
    poll_interval_secs: u64,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 20)]
    http_timeout_secs: u64,

    #[arg(long, env = "ITEMS_PER_PAGE", default_value_t = analytics::DEFAULT_ITEMS_PER_PAGE)]
    items_per_page: usize,

    #[arg(long, env = "VIEW_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    view_socket: String,

    #[arg(long, env = "METRICS_ADDR", default_value = "127.0.0.1:9110")]
    metrics_addr: SocketAddr,
}

fn validate_args(args: &Args) -> anyhow::Result<()> {
    if args.poll_interval_secs == 0 {
        bail!("poll interval must be at least one second");
    }
    if args.http_timeout_secs == 0 {
        bail!("http timeout must be at least one second");
    }
    if args.items_per_page == 0 {
        bail!("items per page must be at least one");
    }
    Ok(())
}

fn build_source(args: &Args) -> anyhow::Result<HttpSource> {
    let snapshot = snapshot_url(
        &args.snapshot_base_url,
        &args.snapshot_token,
        &args.snapshot_ns,
    )?;
    let history = parse_url(&args.history_url)?;
    Ok(HttpSource::new(
        snapshot,
        history,
        Duration::from_secs(args.http_timeout_secs),
    )?)
}

fn log_startup(args: &Args, session_id: &str) {
    info!(base = %args.snapshot_base_url, ns = %args.snapshot_ns, "snapshot source configured");
    info!(url = %args.history_url, "history source configured");
    info!(
        interval_secs = args.poll_interval_secs,
        items_per_page = args.items_per_page,
        "polling planned"
    );
    info!(socket = %args.view_socket, "view socket bind planned");
    info!(addr = %args.metrics_addr, "metrics bind planned");
    info!(%session_id, "session initialized");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    validate_args(&args)?;
    let source = build_source(&args)?;
    info!(
        snapshot = %source.snapshot_url(),
        history = %source.history_url(),
        "booting stakedashd"
    );

    let session_id = Uuid::new_v4().to_string();
    log_startup(&args, &session_id);

    let metrics = MetricsHandle::new()?;
    let poll_interval = Duration::from_secs(args.poll_interval_secs);
    let dashboard = Dashboard::with_metrics(Arc::new(source), poll_interval, metrics.clone());

    let service = ViewService::new(
        session_id.clone(),
        dashboard.store(),
        poll_interval,
        args.items_per_page,
    );
    let socket_path = args.view_socket.clone();
    let ipc_task = task::spawn(async move {
        let handler = move |req: ViewRequest| -> anyhow::Result<ViewResponse> {
            service.handle(req)
        };
        if let Err(err) = run_server(&socket_path, handler).await {
            tracing::error!(error = ?err, "view ipc server failed");
        }
    });

    let metrics_addr = args.metrics_addr;
    let metrics_task = task::spawn(async move {
        if let Err(err) = metrics.serve(metrics_addr).await {
            tracing::error!(error = ?err, "metrics server error");
        }
    });

    dashboard.start();
    info!(%session_id, "ready");

    tokio::signal::ctrl_c().await?;
    info!(%session_id, "shutting down");
    dashboard.stop();
    ipc_task.abort();
    metrics_task.abort();
    let _ = std::fs::remove_file(&args.view_socket);
    Ok(())
}
