use crate::*;

#[tokio::test(start_paused = true)]
async fn test_shutdown_without_startup() {
    let h = Harness::new();
    h.coord.shutdown().await;
    h.coord.shutdown().await;
    settle().await;

    assert_eq!(h.platform.count("unregister"), 1);
    assert_eq!(h.platform.count("clear_local_services"), 1);
    assert_eq!(h.platform.count("clear_service_requests"), 1);
    assert!(h.coord.is_shut_down());
    assert!(!h.coord.is_enabled());
}

#[tokio::test(start_paused = true)]
async fn test_startup_is_idempotent() {
    let h = Harness::started().await;
    h.coord.startup().await;
    settle().await;

    assert_eq!(h.platform.count("discover_peers"), 1);
    assert!(h.coord.status().await.started);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_everything() {
    let h = Harness::started().await;
    h.coord.find_advertised_name("org.alljoyn").await;
    h.coord.advertise_name("org.alljoyn.Svc", "g").await;
    h.coord.cancel_advertise_name("org.alljoyn.Svc", "g").await;
    h.coord.establish_link(PEER_A, 7).await;
    settle().await;
    assert!(h.coord.connection_timeout_armed());
    assert_eq!(h.coord.handles().len(), 1);

    h.coord.shutdown().await;
    settle().await;
    assert!(h.coord.handles().is_empty());

    assert!(!h.coord.connection_timeout_armed());
    assert!(!h.coord.periodic_find_armed());
    assert!(!h.coord.periodic_discovery_armed());

    let status = h.coord.status().await;
    assert!(!status.enabled);
    assert_eq!(status.pending_withdrawals, 0);
    assert!(status.requested_names.is_empty());
    assert!(status.advertised_names.is_empty());
    assert_eq!(status.find_state, FindState::Idle);

    // Nothing reaches the platform any more, timers included.
    h.platform.clear_calls();
    tokio::time::sleep(Duration::from_secs(600)).await;
    let disabled = Status::P2pDisabled.as_return();
    assert_eq!(h.coord.find_advertised_name("org.alljoyn").await, disabled);
    assert_eq!(h.coord.advertise_name("org.alljoyn.B", "g").await, disabled);
    assert_eq!(h.coord.establish_link(PEER_B, 7).await, disabled);
    assert_eq!(h.coord.release_link(1).await, disabled);
    h.coord.handle_event(PlatformEvent::PeersChanged).await;
    assert!(h.platform.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disable_then_enable_resumes_search() {
    let h = Harness::started().await;
    h.coord.find_advertised_name("org.alljoyn").await;
    settle().await;
    assert_eq!(h.coord.find_state().await, FindState::Discovering);

    h.inject(PlatformEvent::StateChanged { enabled: false }).await;
    assert_eq!(h.coord.find_state().await, FindState::Idle);
    assert!(!h.coord.periodic_discovery_armed());
    assert!(!h.coord.periodic_find_armed());
    assert_eq!(
        h.coord.advertise_name("org.alljoyn.X", "g").await,
        Status::P2pDisabled.as_return()
    );

    h.platform.clear_calls();
    h.inject(PlatformEvent::StateChanged { enabled: true }).await;
    assert!(h.platform.called("clear_service_requests"));
    assert!(h.platform.called("add_service_request *"));
    assert!(h.platform.called("discover_services"));
    assert_eq!(h.coord.find_state().await, FindState::Discovering);
    assert!(h.coord.periodic_discovery_armed());
}

#[tokio::test(start_paused = true)]
async fn test_disable_drops_connection_attempt() {
    let h = Harness::started().await;
    h.coord.establish_link(PEER_A, 7).await;
    settle().await;

    h.inject(PlatformEvent::StateChanged { enabled: false }).await;

    assert_eq!(h.coord.peer_state().await, PeerState::Disconnected);
    assert!(!h.coord.connection_timeout_armed());
    let status = h.coord.status().await;
    assert!(status.target_device.is_none());
    assert!(!status.initiator);
    assert!(!status.pending_connect);
}

#[tokio::test(start_paused = true)]
async fn test_this_device_is_tracked() {
    let h = Harness::started().await;
    assert_eq!(
        h.coord.status().await.this_device.as_deref(),
        Some(THIS_DEVICE)
    );
}
