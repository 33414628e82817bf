//! Target resolution order and local detection.

use truth_serum::config::EndpointsConfig;
use truth_serum::resolver::{resolve, TargetSource};

use crate::support::{refused_base_url, serve};

const REMOTE: &str = "https://remote.invalid/api";

fn endpoints(local_base: &str) -> EndpointsConfig {
    EndpointsConfig {
        local_base: local_base.to_owned(),
        remote_base: REMOTE.to_owned(),
        ..EndpointsConfig::default()
    }
}

#[tokio::test]
async fn explicit_base_wins_and_is_trimmed() {
    let server = serve(&[("/healthcheck", 200, "{}")]);
    let resolved = resolve(
        Some("http://10.0.0.5:8080/api/"),
        true,
        false,
        &endpoints(&server.base_url),
    )
    .await;

    assert_eq!(resolved.base_url, "http://10.0.0.5:8080/api");
    assert_eq!(resolved.source, TargetSource::Explicit);
    assert!(server.recorded().is_empty(), "no health check expected");
}

#[tokio::test]
async fn forced_local_skips_health_check() {
    let server = serve(&[]);
    let resolved = resolve(None, true, false, &endpoints(&server.base_url)).await;

    assert_eq!(resolved.base_url, server.base_url);
    assert_eq!(resolved.source, TargetSource::ForcedLocal);
    assert!(server.recorded().is_empty());
}

#[tokio::test]
async fn forced_remote_skips_health_check() {
    let server = serve(&[("/healthcheck", 200, "{}")]);
    let resolved = resolve(None, false, true, &endpoints(&server.base_url)).await;

    assert_eq!(resolved.base_url, REMOTE);
    assert_eq!(resolved.source, TargetSource::ForcedRemote);
    assert!(server.recorded().is_empty());
}

#[tokio::test]
async fn healthy_local_is_detected() {
    let server = serve(&[("/healthcheck", 200, r#"{"status":"ok"}"#)]);
    let resolved = resolve(None, false, false, &endpoints(&server.base_url)).await;

    assert_eq!(resolved.source, TargetSource::DetectedLocal);
    assert_eq!(resolved.base_url, server.base_url);
    let requests = server.recorded();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/healthcheck");
}

#[tokio::test]
async fn unhealthy_local_falls_back_to_remote() {
    let server = serve(&[("/healthcheck", 503, r#"{"status":"degraded"}"#)]);
    let resolved = resolve(None, false, false, &endpoints(&server.base_url)).await;

    assert_eq!(resolved.source, TargetSource::FallbackRemote);
    assert_eq!(resolved.base_url, REMOTE);
}

#[tokio::test]
async fn unreachable_local_falls_back_to_remote() {
    let resolved = resolve(None, false, false, &endpoints(&refused_base_url())).await;

    assert_eq!(resolved.source, TargetSource::FallbackRemote);
    assert_eq!(resolved.base_url, REMOTE);
}
