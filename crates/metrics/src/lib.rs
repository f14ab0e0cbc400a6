use anyhow::Result;
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use tracing::info;

pub const SOURCE_SNAPSHOT: &str = "snapshot";
pub const SOURCE_HISTORY: &str = "history";

#[derive(Clone)]
pub struct MetricsHandle {
    registry: Registry,
    polls: IntCounterVec,
    last_success: IntGaugeVec,
    stakers: IntGauge,
    history_points: IntGauge,
}

impl MetricsHandle {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let polls = IntCounterVec::new(
            Opts::new("stakedash_polls_total", "Source fetches by outcome"),
            &["source", "outcome"],
        )?;
        let last_success = IntGaugeVec::new(
            Opts::new(
                "stakedash_last_success_timestamp_seconds",
                "Unix time of the last successful fetch per source",
            ),
            &["source"],
        )?;
        let stakers = IntGauge::new("stakedash_stakers", "Stakers with non-zero staking power")?;
        let history_points =
            IntGauge::new("stakedash_history_points", "Samples in the history series")?;

        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(last_success.clone()))?;
        registry.register(Box::new(stakers.clone()))?;
        registry.register(Box::new(history_points.clone()))?;

        Ok(Self {
            registry,
            polls,
            last_success,
            stakers,
            history_points,
        })
    }

    pub fn record_success(&self, source: &str, unix_ts: i64) {
        self.polls.with_label_values(&[source, "ok"]).inc();
        self.last_success.with_label_values(&[source]).set(unix_ts);
    }

    pub fn record_failure(&self, source: &str) {
        self.polls.with_label_values(&[source, "error"]).inc();
    }

    pub fn set_stakers(&self, count: usize) {
        self.stakers.set(count as i64);
    }

    pub fn set_history_points(&self, count: usize) {
        self.history_points.set(count as i64);
    }

    pub fn render(&self) -> Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }

    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let make_svc = make_service_fn(move |_| {
            let handle = self.clone();
            async move {
                Ok::<_, hyper::Error>(service_fn(move |_req: Request<Body>| {
                    let handle = handle.clone();
                    async move {
                        match handle.render() {
                            Ok((content_type, buffer)) => Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", content_type)
                                .body(Body::from(buffer)),
                            Err(err) => Response::builder()
                                .status(StatusCode::INTERNAL_SERVER_ERROR)
                                .body(Body::from(err.to_string())),
                        }
                    }
                }))
            }
        });

        let server = Server::try_bind(&addr)?.serve(make_svc);
        info!(%addr, "metrics exporter listening");
        server.await?;
        Ok(())
    }
}
