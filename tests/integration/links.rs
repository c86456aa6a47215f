use p2plink_core::handle::preferred_handle;

use crate::*;

/// Accept an incoming group owned by `owner`, as if the peer connected to us.
async fn incoming_from(h: &mut Harness, owner: &str) {
    h.inject(connection_info(true)).await;
    h.inject(group_info(owner)).await;
    h.drain();
    assert_eq!(h.coord.peer_state().await, PeerState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_handle_is_stable_per_device() {
    let h = Harness::started().await;
    let device = "AA:BB:CC:DD:EE:FF";

    let handle = h.coord.establish_link(device, 7).await;
    assert_eq!(handle, preferred_handle(device));
    settle().await;

    assert!(h.platform.called(&format!("connect {device}")));
    assert_eq!(h.coord.peer_state().await, PeerState::Connecting);
    assert!(h.coord.connection_timeout_armed());
    assert_eq!(h.coord.find_state().await, FindState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_second_link_is_busy() {
    let h = Harness::started().await;
    let handle = h.coord.establish_link(PEER_A, 7).await;
    assert!(handle > 0);

    assert_eq!(
        h.coord.establish_link(PEER_B, 7).await,
        Status::P2pBusy.as_return()
    );
    settle().await;

    let status = h.coord.status().await;
    assert_eq!(status.target_device.as_deref(), Some(PEER_A));
    assert_eq!(status.target_handle, Some(handle));
    assert!(status.initiator);
    assert_eq!(h.platform.count("connect"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_address_is_invalid() {
    let h = Harness::started().await;
    assert_eq!(
        h.coord.establish_link("", 7).await,
        Status::InvalidAddress.as_return()
    );
    assert_eq!(h.platform.count("connect"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_group_formed_reports_established() {
    let mut h = Harness::started().await;
    let handle = h.connect(PEER_A).await;

    assert_eq!(
        h.drain(),
        vec![LinkEvent::LinkEstablished {
            handle,
            interface_name: GROUP_IFACE.to_string(),
        }]
    );
    assert!(!h.coord.connection_timeout_armed());

    let status = h.coord.status().await;
    assert_eq!(status.group_owner.as_deref(), Some(PEER_A));
    assert_eq!(status.interface.as_deref(), Some(GROUP_IFACE));
}

#[tokio::test(start_paused = true)]
async fn test_release_connected_link_reports_lost_once() {
    let mut h = Harness::started().await;
    let handle = h.connect(PEER_A).await;
    h.drain();

    assert_eq!(h.coord.release_link(handle).await, 0);
    settle().await;
    assert!(h.platform.called("remove_group"));
    assert_eq!(h.coord.peer_state().await, PeerState::Disconnecting);

    h.inject(PlatformEvent::ConnectionChanged).await;
    assert!(h.platform.called("request_connection_info"));
    h.inject(connection_info(false)).await;

    assert_eq!(h.drain(), vec![LinkEvent::LinkLost { handle }]);
    assert_eq!(h.coord.peer_state().await, PeerState::Disconnected);
    assert!(h.coord.status().await.target_device.is_none());
    // Search and advertisement resume once the link is gone.
    assert!(h.coord.periodic_find_armed());
}

#[tokio::test(start_paused = true)]
async fn test_remove_group_failure_reports_error_once() {
    let mut h = Harness::started().await;
    h.platform.fail("remove_group", FailureReason::Busy);
    let handle = h.connect(PEER_A).await;
    h.drain();

    assert_eq!(h.coord.release_link(handle).await, 0);
    settle().await;
    assert_eq!(
        h.drain(),
        vec![LinkEvent::LinkError {
            handle,
            error: Status::P2pBusy.as_return(),
        }]
    );
    assert_eq!(h.coord.peer_state().await, PeerState::Disconnected);

    // A late "no group" report must not add a LinkLost.
    h.inject(connection_info(false)).await;
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_peer_removing_group_reports_lost() {
    let mut h = Harness::started().await;
    let handle = h.connect(PEER_A).await;
    h.drain();

    h.inject(connection_info(false)).await;
    assert_eq!(h.drain(), vec![LinkEvent::LinkLost { handle }]);
    assert_eq!(h.coord.peer_state().await, PeerState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_connection_timeout_reports_error() {
    let mut h = Harness::started().await;
    let handle = h.coord.establish_link(PEER_A, 7).await;
    settle().await;
    assert!(h.coord.connection_timeout_armed());

    tokio::time::sleep(Duration::from_secs(149)).await;
    assert!(!h.platform.called("request_connection_info"));

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    assert!(h.platform.called("request_connection_info"));

    h.inject(connection_info(false)).await;
    assert!(h.platform.called("cancel_connect"));
    assert_eq!(
        h.drain(),
        vec![LinkEvent::LinkError {
            handle,
            error: Status::P2pTimeout.as_return(),
        }]
    );
    assert_eq!(h.coord.peer_state().await, PeerState::Disconnected);
    assert!(!h.coord.status().await.initiator);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_maps_reason() {
    let cases = [
        (FailureReason::Unsupported, Status::P2pDisabled),
        (FailureReason::Busy, Status::P2pBusy),
        (FailureReason::Error, Status::P2p),
    ];
    for (reason, status) in cases {
        let mut h = Harness::started().await;
        h.platform.fail("connect", reason);

        let handle = h.coord.establish_link(PEER_A, 7).await;
        assert!(handle > 0);
        settle().await;

        assert_eq!(
            h.drain(),
            vec![LinkEvent::LinkError {
                handle,
                error: status.as_return(),
            }],
            "reason {reason:?}"
        );
        assert_eq!(h.coord.peer_state().await, PeerState::Disconnected);
        assert!(h.coord.status().await.target_device.is_none());
        h.coord.shutdown().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_release_while_connecting_cancels() {
    let mut h = Harness::started().await;
    let handle = h.coord.establish_link(PEER_A, 7).await;
    settle().await;

    assert_eq!(h.coord.release_link(handle).await, 0);
    settle().await;

    assert!(h.platform.called("cancel_connect"));
    assert_eq!(h.coord.peer_state().await, PeerState::Disconnected);
    assert!(!h.coord.connection_timeout_armed());
    assert!(h.coord.periodic_find_armed());
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_release_without_link_is_noop() {
    let h = Harness::started().await;
    assert_eq!(h.coord.release_link(5).await, 0);
    assert!(!h.platform.called("remove_group"));
    assert!(!h.platform.called("cancel_connect"));
}

#[tokio::test(start_paused = true)]
async fn test_link_to_other_device_replaces_incoming_group() {
    let mut h = Harness::started().await;
    incoming_from(&mut h, PEER_A).await;

    let handle = h.coord.establish_link(PEER_B, 7).await;
    assert_eq!(handle, preferred_handle(PEER_B));
    settle().await;
    assert!(h.platform.called("remove_group"));
    assert!(h.coord.status().await.pending_connect);

    // The old group goes away; the queued connect follows.
    h.inject(connection_info(false)).await;
    assert!(h.platform.called(&format!("connect {PEER_B}")));
    assert!(h.drain().is_empty());
    assert_eq!(h.coord.peer_state().await, PeerState::Connecting);

    h.inject(connection_info(true)).await;
    h.inject(group_info(PEER_B)).await;
    assert_eq!(
        h.drain(),
        vec![LinkEvent::LinkEstablished {
            handle,
            interface_name: GROUP_IFACE.to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_background_cannot_replace_link() {
    let mut h = Harness::started().await;
    h.platform.set_background(true);
    incoming_from(&mut h, PEER_A).await;

    assert_eq!(
        h.coord.establish_link(PEER_B, 7).await,
        Status::P2p.as_return()
    );
    settle().await;

    let status = h.coord.status().await;
    assert!(!status.initiator);
    assert!(status.target_device.is_none());
    assert!(!h.platform.called("remove_group"));
    assert_eq!(h.coord.peer_state().await, PeerState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_link_to_current_owner_reuses_group() {
    let mut h = Harness::started().await;
    incoming_from(&mut h, PEER_A).await;
    assert_eq!(h.platform.count("request_group_info"), 1);

    let handle = h.coord.establish_link(PEER_A, 7).await;
    assert!(handle > 0);
    assert_eq!(h.platform.count("request_group_info"), 2);

    h.inject(group_info(PEER_A)).await;
    assert_eq!(
        h.drain(),
        vec![LinkEvent::LinkEstablished {
            handle,
            interface_name: GROUP_IFACE.to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_interface_lookup_by_handle() {
    let h = Harness::started().await;
    assert_eq!(
        h.coord.get_interface_name_from_handle(0).await.as_deref(),
        Some(GROUP_IFACE)
    );
    assert!(h.coord.get_interface_name_from_handle(12345).await.is_none());

    let handle = h.coord.establish_link(PEER_A, 7).await;
    assert_eq!(
        h.coord.get_interface_name_from_handle(handle).await.as_deref(),
        Some(GROUP_IFACE)
    );
}
