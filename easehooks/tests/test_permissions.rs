use easehooks::mock::ChannelPermissionSource;
use easehooks::{PermissionMonitor, PermissionState, PermissionStatus};
use std::time::Duration;

#[tokio::test]
async fn test_unsupported_platform_never_grants() {
    let source = ChannelPermissionSource::unsupported();
    let monitor = PermissionMonitor::start(&source, "geolocation");

    assert_eq!(monitor.ready().await.unwrap(), PermissionStatus::Unsupported);
    assert!(!monitor.has_permission());
    assert_eq!(source.queried(), vec!["geolocation".to_string()]);
}

#[tokio::test]
async fn test_initial_grant_is_reported() {
    let (source, _changes) = ChannelPermissionSource::new(PermissionState::Granted);
    let monitor = PermissionMonitor::start(&source, "camera");

    let status = monitor.ready().await.unwrap();
    assert_eq!(status.state(), Some(PermissionState::Granted));
    assert!(monitor.has_permission());
    assert_eq!(monitor.name(), "camera");
}

#[tokio::test]
async fn test_changes_follow_the_platform() {
    let (source, changes) = ChannelPermissionSource::new(PermissionState::Prompt);
    let monitor = PermissionMonitor::start(&source, "notifications");
    assert!(!monitor.ready().await.unwrap().has_permission());

    changes.unbounded_send(PermissionState::Granted).unwrap();
    changes.unbounded_send(PermissionState::Denied).unwrap();
    drop(changes);

    let mut status = monitor.await_state().await.unwrap();
    while status != PermissionStatus::Known(PermissionState::Denied) {
        tokio::task::yield_now().await;
        status = monitor.await_state().await.unwrap();
    }
    assert!(!monitor.has_permission());
}

#[tokio::test]
async fn test_dropped_monitor_stops_following() {
    let (source, changes) = ChannelPermissionSource::new(PermissionState::Denied);
    let monitor = PermissionMonitor::start(&source, "microphone");
    monitor.ready().await.unwrap();
    drop(monitor);

    tokio::time::timeout(Duration::from_secs(1), async {
        while !changes.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("monitor task released its change stream");
}
