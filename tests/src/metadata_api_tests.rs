//! HTTP surface tests that need no wallet session: metadata, health,
//! metrics and request correlation.

use anyhow::Result;
use axum::http::StatusCode;
use cryptodevs_types::COLLECTION_DESCRIPTION;

use crate::utils::{build_app, send, test_config, MockNode};

#[tokio::test]
async fn test_metadata_for_token_id() -> Result<()> {
    let node = MockNode::start().await?;
    let mut config = test_config(&node);
    config.image_base_url = "https://img.example/cryptodevs/".to_string();
    let (app, _state) = build_app(config)?;

    let (status, _, body) = send(&app, "GET", "/api/7", &[]).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Crypto Dev #7");
    assert_eq!(body["description"], COLLECTION_DESCRIPTION);
    assert_eq!(body["image"], "https://img.example/cryptodevs/7.svg");

    // Metadata never touches the chain.
    assert_eq!(node.calls("eth_call"), 0);
    Ok(())
}

#[tokio::test]
async fn test_metadata_echoes_unvalidated_ids() -> Result<()> {
    let node = MockNode::start().await?;
    let (app, _state) = build_app(test_config(&node))?;

    for id in ["0", "99999", "abc"] {
        let (status, _, body) = send(&app, "GET", &format!("/api/{id}"), &[]).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], format!("Crypto Dev #{id}"));
        assert!(body["image"].as_str().unwrap().ends_with(&format!("/{id}.svg")));
    }
    Ok(())
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() -> Result<()> {
    let node = MockNode::start().await?;
    let (app, _state) = build_app(test_config(&node))?;

    let (_, headers, _) = send(&app, "GET", "/api/1", &[("x-request-id", "trace-42")]).await?;
    assert_eq!(headers["x-request-id"], "trace-42");

    let (_, headers, _) = send(&app, "GET", "/health", &[]).await?;
    let generated = headers["x-request-id"].to_str()?;
    assert!(generated.starts_with("dapp-"));
    Ok(())
}

#[tokio::test]
async fn test_health_reports_rpc_and_contract() -> Result<()> {
    let node = MockNode::start().await?;
    let (app, _state) = build_app(test_config(&node))?;

    let (status, _, body) = send(&app, "GET", "/health", &[]).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rpc_status"], "ok");
    assert_eq!(body["chain_id"], 5);
    assert_eq!(body["active_rpc"], node.url.as_str());
    assert!(body.get("account").is_none());
    Ok(())
}

#[tokio::test]
async fn test_health_unavailable_without_node() -> Result<()> {
    let node = MockNode::start().await?;
    let mut config = test_config(&node);
    config.rpc_url = "http://127.0.0.1:9".to_string();
    config.fallback_rpc_url = "http://127.0.0.1:9".to_string();
    let (app, _state) = build_app(config)?;

    let (status, _, body) = send(&app, "GET", "/health", &[]).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unavailable");
    Ok(())
}

#[tokio::test]
async fn test_metrics_exposition() -> Result<()> {
    let node = MockNode::start().await?;
    let (app, _state) = build_app(test_config(&node))?;

    let (status, headers, body) = send(&app, "GET", "/metrics", &[]).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(headers["content-type"].to_str()?.starts_with("text/plain"));
    let text = body.as_str().unwrap();
    assert!(text.contains("cryptodevs_wallet_connected 0"));
    assert!(text.contains("cryptodevs_tokens_minted 0"));
    Ok(())
}

#[tokio::test]
async fn test_health_counts_every_route() -> Result<()> {
    let node = MockNode::start().await?;
    let (app, _state) = build_app(test_config(&node))?;

    send(&app, "GET", "/status", &[]).await?;
    send(&app, "GET", "/metrics", &[]).await?;
    send(&app, "GET", "/api/3", &[]).await?;

    let (_, _, body) = send(&app, "GET", "/health", &[]).await?;
    assert_eq!(body["requests"], 4);
    Ok(())
}
