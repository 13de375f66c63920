// ABOUTME: Integration tests for the connection monitor.
// ABOUTME: Snapshot-then-delta ordering, slow subscriber disconnect and unsubscribe on drop.

mod support;

use futures::StreamExt;
use nsendpoint::connection::{ConnectionState, EventKind};
use nsendpoint::monitor::{ConnectionMonitor, MonitorError};
use nsendpoint::types::ConnectionId;
use support::connection;

mod table {
    use super::*;

    #[test]
    fn add_rejects_duplicate_id() {
        let monitor = ConnectionMonitor::default();
        monitor.add(connection("1")).unwrap();

        let err = monitor.add(connection("1")).unwrap_err();
        assert!(matches!(err, MonitorError::DuplicateId(id) if id.as_str() == "1"));
        assert_eq!(monitor.len(), 1);
    }

    #[test]
    fn update_requires_existing_id() {
        let monitor = ConnectionMonitor::default();
        let err = monitor.update(connection("7")).unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
        assert!(monitor.is_empty());
    }

    #[test]
    fn update_replaces_record() {
        let monitor = ConnectionMonitor::default();
        monitor.add(connection("1")).unwrap();

        let mut changed = connection("1");
        changed.state = ConnectionState::Closing;
        monitor.update(changed).unwrap();

        let stored = monitor.get(&ConnectionId::new("1")).unwrap();
        assert_eq!(stored.state, ConnectionState::Closing);
    }

    #[test]
    fn delete_of_unknown_id_is_noop() {
        let monitor = ConnectionMonitor::default();
        let mut sub = monitor.subscribe();
        let _ = sub.try_recv();

        assert!(monitor.delete(&ConnectionId::new("missing")).is_none());
        assert!(sub.try_recv().is_none(), "nothing should be published");
    }

    #[test]
    fn delete_twice_publishes_once() {
        let monitor = ConnectionMonitor::default();
        monitor.add(connection("1")).unwrap();
        let mut sub = monitor.subscribe();
        let _ = sub.try_recv();

        assert!(monitor.delete(&ConnectionId::new("1")).is_some());
        assert!(monitor.delete(&ConnectionId::new("1")).is_none());

        assert_eq!(sub.try_recv().unwrap().kind, EventKind::Delete);
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn delete_with_publishes_given_final_state() {
        let monitor = ConnectionMonitor::default();
        monitor.add(connection("1")).unwrap();
        let mut sub = monitor.subscribe();
        let _ = sub.try_recv();

        let mut closed = connection("1");
        closed.state = ConnectionState::Closed;
        assert!(monitor.delete_with(closed));
        assert!(!monitor.delete_with(connection("1")));

        let event = sub.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Delete);
        let record = event.connections.values().next().unwrap();
        assert_eq!(record.state, ConnectionState::Closed);
        assert!(monitor.is_empty());
    }
}

mod subscribe {
    use super::*;

    #[test]
    fn initial_event_holds_current_table() {
        let monitor = ConnectionMonitor::default();
        monitor.add(connection("1")).unwrap();
        monitor.add(connection("2")).unwrap();

        let mut sub = monitor.subscribe();
        let initial = sub.try_recv().expect("initial event");

        assert_eq!(initial.kind, EventKind::Initial);
        assert_eq!(initial.connections, monitor.snapshot());
        assert!(sub.try_recv().is_none(), "exactly one initial event");
    }

    #[test]
    fn initial_event_for_empty_table_is_empty() {
        let monitor = ConnectionMonitor::default();
        let mut sub = monitor.subscribe();

        let initial = sub.try_recv().unwrap();
        assert_eq!(initial.kind, EventKind::Initial);
        assert!(initial.connections.is_empty());
    }

    #[test]
    fn only_changes_after_subscribing_are_delivered() {
        let monitor = ConnectionMonitor::default();
        monitor.add(connection("1")).unwrap();

        let mut sub = monitor.subscribe();
        monitor.add(connection("2")).unwrap();
        monitor.delete(&ConnectionId::new("1"));

        let initial = sub.try_recv().unwrap();
        assert_eq!(initial.connections.len(), 1);
        assert!(initial.connections.contains_key(&ConnectionId::new("1")));

        let update = sub.try_recv().unwrap();
        assert_eq!(update.kind, EventKind::Update);
        assert!(update.connections.contains_key(&ConnectionId::new("2")));

        let delete = sub.try_recv().unwrap();
        assert_eq!(delete.kind, EventKind::Delete);
        assert!(delete.connections.contains_key(&ConnectionId::new("1")));

        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn events_arrive_in_mutation_order() {
        let monitor = ConnectionMonitor::new(128);
        let mut sub = monitor.subscribe();

        for i in 0..20 {
            monitor.add(connection(&i.to_string())).unwrap();
        }

        let initial = sub.next().await.unwrap();
        assert_eq!(initial.kind, EventKind::Initial);
        for i in 0..20 {
            let event = sub.next().await.unwrap();
            let id = event.connections.keys().next().unwrap();
            assert_eq!(id.as_str(), i.to_string());
        }
    }

    #[tokio::test]
    async fn concurrent_subscribers_see_consistent_baseline() {
        let monitor = ConnectionMonitor::new(1024);

        let writer = {
            let monitor = monitor.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    monitor.add(connection(&i.to_string())).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut subs = Vec::new();
        for _ in 0..10 {
            subs.push(monitor.subscribe());
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        for mut sub in subs {
            let initial = sub.try_recv().unwrap();
            let mut seen: Vec<String> = initial
                .connections
                .keys()
                .map(|id| id.as_str().to_string())
                .collect();
            while let Some(event) = sub.try_recv() {
                assert_eq!(event.kind, EventKind::Update);
                for id in event.connections.keys() {
                    assert!(
                        !seen.contains(&id.as_str().to_string()),
                        "delta duplicates baseline: {id}"
                    );
                    seen.push(id.as_str().to_string());
                }
            }
            assert_eq!(seen.len(), 200, "no delta may be missed");
        }
    }
}

mod backpressure {
    use super::*;

    #[test]
    fn slow_subscriber_is_disconnected_without_blocking_writer() {
        let monitor = ConnectionMonitor::new(2);
        let mut slow = monitor.subscribe();
        let mut fast = monitor.subscribe();
        let _ = fast.try_recv();

        // slow holds INITIAL + one UPDATE; the second UPDATE overflows it
        monitor.add(connection("1")).unwrap();
        let _ = fast.try_recv();
        monitor.add(connection("2")).unwrap();
        let _ = fast.try_recv();

        assert_eq!(monitor.subscriber_count(), 1, "slow subscriber dropped");

        // Buffered events drain, then the stream ends
        assert_eq!(slow.try_recv().unwrap().kind, EventKind::Initial);
        assert_eq!(slow.try_recv().unwrap().kind, EventKind::Update);
        assert!(slow.try_recv().is_none());

        monitor.add(connection("3")).unwrap();
        assert!(fast.try_recv().is_some(), "other subscribers unaffected");
    }

    #[tokio::test]
    async fn disconnected_stream_terminates() {
        let monitor = ConnectionMonitor::new(1);
        let mut sub = monitor.subscribe();

        monitor.add(connection("1")).unwrap();

        assert_eq!(sub.next().await.unwrap().kind, EventKind::Initial);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let monitor = ConnectionMonitor::default();
        let sub = monitor.subscribe();
        let other = monitor.subscribe();
        assert_eq!(monitor.subscriber_count(), 2);

        drop(sub);
        assert_eq!(monitor.subscriber_count(), 1);

        drop(other);
        assert_eq!(monitor.subscriber_count(), 0);
        monitor.add(connection("1")).unwrap();
    }

    #[tokio::test]
    async fn stream_ends_when_monitor_is_dropped() {
        let monitor = ConnectionMonitor::default();
        let mut sub = monitor.subscribe();
        drop(monitor);

        assert_eq!(sub.recv().await.unwrap().kind, EventKind::Initial);
        assert!(sub.recv().await.is_none());
    }
}
