use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use sources::{parse_url, HttpSource, SourceError, StakingSource};

const SNAPSHOT: &str = r#"{"result":{"data":{"json":{
    "stakers":[
        {"wallet":"whale","uiStakingPower":900.5,"uiAmount":500,"startTs":1700000000,"endTs":1731536000},
        {"wallet":"unlocked","uiStakingPower":0,"uiAmount":50,"startTs":1700000000,"endTs":0},
        {"wallet":"minnow","uiStakingPower":3.2,"uiAmount":3,"startTs":1700000000,"endTs":1700864000}
    ],
    "totalUIStaked":553,
    "totalUIStakingPower":"903.7",
    "ts":"2025-02-19T12:00:00.000Z"
}}}}"#;

const HISTORY: &str = r#"[
    {"id":1,"timestamp":"2025-02-17T00:00:00Z","staker":10,"stakingPower":100,"stakedME":1000},
    {"id":2,"timestamp":"2025-02-18T00:00:00Z","staker":12,"stakingPower":120,"stakedME":1100}
]"#;

async fn route(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let (status, body) = match req.uri().path() {
        "/snapshot" => (StatusCode::OK, SNAPSHOT),
        "/history" => (StatusCode::OK, HISTORY),
        "/garbage" => (StatusCode::OK, "<html>maintenance</html>"),
        "/blank" => (StatusCode::OK, "  \n"),
        "/down" => (StatusCode::SERVICE_UNAVAILABLE, "down"),
        _ => (StatusCode::NOT_FOUND, "not found"),
    };
    Ok(Response::builder()
        .status(status)
        .body(Body::from(body))
        .expect("static response"))
}

async fn spawn_server() -> SocketAddr {
    let make_svc = make_service_fn(|_| async { Ok::<_, Infallible>(service_fn(route)) });
    let addr: SocketAddr = "127.0.0.1:0".parse().expect("addr");
    let server = Server::try_bind(&addr)
        .expect("bind test server")
        .serve(make_svc);
    let local = server.local_addr();
    tokio::spawn(server);
    local
}

fn source(addr: SocketAddr, snapshot: &str, history: &str) -> HttpSource {
    HttpSource::new(
        parse_url(&format!("http://{addr}{snapshot}")).expect("snapshot url"),
        parse_url(&format!("http://{addr}{history}")).expect("history url"),
        Duration::from_secs(5),
    )
    .expect("client")
}

#[tokio::test]
async fn fetches_snapshot_and_drops_zero_power() {
    let addr = spawn_server().await;
    let snapshot = source(addr, "/snapshot", "/history")
        .fetch_snapshot()
        .await
        .expect("snapshot");

    let wallets: Vec<_> = snapshot.stakers.iter().map(|s| s.wallet.as_str()).collect();
    assert_eq!(wallets, ["whale", "minnow"]);
    assert_eq!(snapshot.totals.total_staked, Some(553));
    assert_eq!(snapshot.totals.total_staking_power, Some(903));
}

#[tokio::test]
async fn fetches_history_in_source_order() {
    let addr = spawn_server().await;
    let history = source(addr, "/snapshot", "/history")
        .fetch_history()
        .await
        .expect("history");

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].staker_count, 10);
    assert_eq!(history[1].staker_count, 12);
}

#[tokio::test]
async fn non_success_status_carries_code_and_text() {
    let addr = spawn_server().await;
    let err = source(addr, "/down", "/missing")
        .fetch_snapshot()
        .await
        .expect_err("503 should fail");
    match err {
        SourceError::HttpStatus { status, status_text } => {
            assert_eq!(status, 503);
            assert_eq!(status_text, "Service Unavailable");
        }
        other => panic!("expected http status error, got {other:?}"),
    }

    let err = source(addr, "/down", "/missing")
        .fetch_history()
        .await
        .expect_err("404 should fail");
    assert!(matches!(err, SourceError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn malformed_and_blank_bodies_are_rejected() {
    let addr = spawn_server().await;
    let err = source(addr, "/garbage", "/garbage")
        .fetch_history()
        .await
        .expect_err("html should fail");
    assert!(matches!(err, SourceError::Parse(_)));

    let err = source(addr, "/blank", "/blank")
        .fetch_snapshot()
        .await
        .expect_err("blank body should fail");
    assert!(matches!(err, SourceError::EmptyData(_)));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let err = source(addr, "/snapshot", "/history")
        .fetch_snapshot()
        .await
        .expect_err("closed port should fail");
    assert!(matches!(err, SourceError::Network(_)));
}
