use crate::*;

const NAME: &str = "org.alljoyn.Svc";
const LIVE: &str = "org.alljoyn.-svc guid=g1 timer=255";
const WITHDRAWN: &str = "org.alljoyn.-svc guid=g1 timer=0";
const LIVE_G2: &str = "org.alljoyn.-svc guid=g2 timer=255";

fn added(record: &str) -> String {
    format!("add_local_service {record}")
}

fn removed(record: &str) -> String {
    format!("remove_local_service {record}")
}

fn times(h: &Harness, call: &str) -> usize {
    h.platform.calls().iter().filter(|c| c.as_str() == call).count()
}

#[tokio::test(start_paused = true)]
async fn test_advertise_publishes_live_record() {
    let h = Harness::started().await;
    assert_eq!(h.coord.advertise_name(NAME, "g1").await, 0);

    assert!(h.platform.called(&added(LIVE)));
    assert_eq!(
        h.coord.status().await.advertised_names,
        vec![NAME.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_withdraws_after_grace() {
    let h = Harness::started().await;
    h.coord.advertise_name(NAME, "g1").await;

    assert_eq!(h.coord.cancel_advertise_name(NAME, "g1").await, 0);
    assert!(h.platform.called(&removed(LIVE)));
    assert!(h.platform.called(&added(WITHDRAWN)));

    let status = h.coord.status().await;
    assert!(status.advertised_names.is_empty());
    assert_eq!(status.pending_withdrawals, 1);

    tokio::time::sleep(Duration::from_secs(255)).await;
    assert!(!h.platform.called(&removed(WITHDRAWN)));

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    assert!(h.platform.called(&removed(WITHDRAWN)));
    assert_eq!(h.coord.status().await.pending_withdrawals, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_is_idempotent() {
    let h = Harness::started().await;
    h.coord.advertise_name(NAME, "g1").await;
    h.coord.cancel_advertise_name(NAME, "g1").await;
    let calls = h.platform.calls().len();

    assert_eq!(h.coord.cancel_advertise_name(NAME, "g1").await, 0);
    assert_eq!(h.platform.calls().len(), calls);

    assert_eq!(h.coord.cancel_advertise_name("org.alljoyn.Never", "").await, 0);
    assert_eq!(h.platform.calls().len(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_readvertise_inside_grace_keeps_name() {
    let h = Harness::started().await;
    h.coord.advertise_name(NAME, "g1").await;
    h.coord.cancel_advertise_name(NAME, "g1").await;

    assert_eq!(h.coord.advertise_name(NAME, "g1").await, 0);
    assert_eq!(times(&h, &removed(WITHDRAWN)), 1);
    assert_eq!(times(&h, &added(LIVE)), 2);
    assert_eq!(h.coord.status().await.pending_withdrawals, 0);

    tokio::time::sleep(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(times(&h, &removed(WITHDRAWN)), 1);
    assert_eq!(times(&h, &removed(LIVE)), 1);
    assert_eq!(
        h.coord.status().await.advertised_names,
        vec![NAME.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_readvertise_with_new_guid_removes_old_withdrawal() {
    let h = Harness::started().await;
    h.coord.advertise_name(NAME, "g1").await;
    h.coord.cancel_advertise_name(NAME, "g1").await;
    h.platform.clear_calls();

    assert_eq!(h.coord.advertise_name(NAME, "g2").await, 0);
    assert_eq!(
        h.platform.calls(),
        vec![removed(WITHDRAWN), added(LIVE_G2)]
    );
    assert_eq!(h.coord.status().await.pending_withdrawals, 0);

    tokio::time::sleep(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(times(&h, &removed(WITHDRAWN)), 1);
    assert_eq!(times(&h, &removed(LIVE_G2)), 0);
}

#[tokio::test(start_paused = true)]
async fn test_names_republished_when_reenabled() {
    let h = Harness::started().await;
    h.coord.advertise_name(NAME, "g1").await;

    h.inject(PlatformEvent::StateChanged { enabled: false }).await;
    h.inject(PlatformEvent::StateChanged { enabled: true }).await;

    assert_eq!(times(&h, &added(LIVE)), 2);
    assert!(h.coord.periodic_find_armed());
}
