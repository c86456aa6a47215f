use std::sync::Arc;

use p2plink_core::config::LoopbackConfig;
use p2plink_services::LoopbackPlatform;
use tokio::sync::{broadcast, mpsc};

use crate::*;

async fn next_event(rx: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Full daemon wiring: loopback platform notifications flow through `run`.
#[tokio::test(start_paused = true)]
async fn test_loopback_link_round_trip() {
    let (platform, platform_events) = LoopbackPlatform::new(LoopbackConfig {
        device_address: THIS_DEVICE.to_string(),
        ..LoopbackConfig::default()
    });
    let platform = Arc::new(platform);
    let (coord, mut events) =
        LinkCoordinator::new(platform.clone(), CoordinatorSettings::default());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    coord.startup().await;
    let runner = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.run(platform_events, shutdown_rx).await })
    };

    assert_eq!(coord.advertise_name("org.alljoyn.Loop", "g").await, 0);
    assert_eq!(platform.local_services().len(), 1);

    let handle = coord.establish_link(PEER_A, 7).await;
    assert!(handle > 0);
    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::LinkEstablished {
            handle,
            interface_name: GROUP_IFACE.to_string(),
        }
    );
    assert_eq!(platform.group_peer().as_deref(), Some(PEER_A));
    assert_eq!(
        coord.get_interface_name_from_handle(handle).await.as_deref(),
        Some(GROUP_IFACE)
    );

    assert_eq!(coord.release_link(handle).await, 0);
    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::LinkLost { handle }
    );
    assert_eq!(coord.peer_state().await, PeerState::Disconnected);

    shutdown_tx.send(()).unwrap();
    runner.await.unwrap();
    assert!(coord.is_shut_down());
    assert!(platform.local_services().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_loopback_readvertise_leaves_only_live_record() {
    let (platform, _platform_events) = LoopbackPlatform::new(LoopbackConfig::default());
    let platform = Arc::new(platform);
    let (coord, _events) =
        LinkCoordinator::new(platform.clone(), CoordinatorSettings::default());
    coord.startup().await;

    coord.advertise_name("org.Foo", "g1").await;
    coord.cancel_advertise_name("org.Foo", "g1").await;
    coord.advertise_name("org.Foo", "g2").await;
    tokio::time::sleep(Duration::from_secs(300)).await;
    settle().await;

    let published: Vec<_> = platform
        .local_services()
        .into_iter()
        .map(|s| (s.instance_name, s.txt["GUID"].clone(), s.txt["TIMER"].clone()))
        .collect();
    assert_eq!(
        published,
        vec![("org.-foo".to_string(), "g2".to_string(), "255".to_string())]
    );
}
