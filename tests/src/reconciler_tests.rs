//! Presale status reconciliation against a live JSON-RPC node.

use alloy_primitives::U256;
use anyhow::Result;
use cryptodevs_types::{next_action, DappAction};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::utils::{build_app, send, test_config, wait_for_state, MockNode, ACCOUNT};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_owner_is_offered_start_presale() -> Result<()> {
    let node = MockNode::start().await?;
    node.with(|s| s.owner = ACCOUNT);
    let (app, state) = build_app(test_config(&node))?;

    state.connect().await?;
    let snapshot = state.session.store().snapshot();
    assert!(snapshot.connected().unwrap().is_owner);
    assert_eq!(next_action(&snapshot), DappAction::StartPresale);

    let (_, _, body) = send(&app, "GET", "/status", &[]).await?;
    assert_eq!(body["action"], "start_presale");
    Ok(())
}

#[tokio::test]
async fn test_running_presale_offers_presale_mint() -> Result<()> {
    let node = MockNode::start().await?;
    node.with(|s| {
        s.presale_started = true;
        s.presale_end = U256::from(unix_now() + 3600);
        s.token_ids = 4;
    });
    let (_app, state) = build_app(test_config(&node))?;

    state.connect().await?;
    let snapshot = state.session.store().snapshot();
    let connected = snapshot.connected().unwrap();
    assert!(connected.presale.started);
    assert!(!connected.presale.ended);
    assert_eq!(connected.minted, 4);
    assert_eq!(next_action(&snapshot), DappAction::PresaleMint);
    // Owner is only consulted before the presale starts.
    assert_eq!(node.calls("owner"), 0);
    Ok(())
}

#[tokio::test]
async fn test_ended_presale_offers_public_mint() -> Result<()> {
    let node = MockNode::start().await?;
    node.with(|s| {
        s.presale_started = true;
        s.presale_end = U256::from(1u64);
    });
    let (_app, state) = build_app(test_config(&node))?;

    state.connect().await?;
    assert_eq!(
        next_action(&state.session.store().snapshot()),
        DappAction::PublicMint
    );
    Ok(())
}

#[tokio::test]
async fn test_loop_picks_up_chain_changes() -> Result<()> {
    let node = MockNode::start().await?;
    let (_app, state) = build_app(test_config(&node))?;
    state.connect().await?;

    node.with(|s| {
        s.presale_started = true;
        s.presale_end = U256::from(unix_now() + 3600);
        s.token_ids = 9;
    });

    wait_for_state(&state, Duration::from_secs(5), |s| {
        s.connected()
            .is_some_and(|c| c.presale.started && c.minted == 9)
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_minted_count_keeps_refreshing_after_presale_ends() -> Result<()> {
    let node = MockNode::start().await?;
    node.with(|s| {
        s.presale_started = true;
        s.presale_end = U256::from(1u64);
    });
    let (_app, state) = build_app(test_config(&node))?;
    state.connect().await?;

    let ended_reads = node.calls("presaleEnded");
    node.with(|s| s.token_ids = 12);
    wait_for_state(&state, Duration::from_secs(5), |s| {
        s.connected().is_some_and(|c| c.minted == 12)
    })
    .await?;

    // Terminal presale state is not re-read.
    assert_eq!(node.calls("presaleEnded"), ended_reads);
    Ok(())
}

#[tokio::test]
async fn test_disconnect_stops_polling() -> Result<()> {
    let node = MockNode::start().await?;
    let (_app, state) = build_app(test_config(&node))?;
    state.connect().await?;
    assert!(state.disconnect().await);

    let reads = node.calls("tokenIds");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(node.calls("tokenIds"), reads);
    Ok(())
}

#[tokio::test]
async fn test_network_switch_marks_session_stale() -> Result<()> {
    let node = MockNode::start().await?;
    let (_app, state) = build_app(test_config(&node))?;
    state.connect().await?;

    node.with(|s| s.chain_id = 1);
    wait_for_state(&state, Duration::from_secs(5), |s| {
        s.connected()
            .is_some_and(|c| c.consecutive_failures > 0 && c.last_error.is_some())
    })
    .await?;
    // Still connected: the failed reads leave state stale rather than clearing it.
    assert!(state.session.store().snapshot().is_connected());
    Ok(())
}
