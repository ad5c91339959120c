use super::*;
use crate::state::test_helpers;
use crate::state::Participant;

#[tokio::test]
async fn get_or_create_is_idempotent() {
    let registry = RoomRegistry::new(EvictionPolicy::Never);
    let key = RoomKey::pair("abc123");

    let a = registry.get_or_create(&key).await;
    let b = registry.get_or_create(&key).await;

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn concurrent_first_joins_resolve_to_one_room() {
    let registry = RoomRegistry::new(EvictionPolicy::Never);
    let key = RoomKey::study_group("race");

    let mut handles = Vec::new();
    for _ in 0..32 {
        let registry = registry.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move { registry.get_or_create(&key).await }));
    }

    let mut rooms = Vec::new();
    for h in handles {
        rooms.push(h.await.expect("task should not panic"));
    }
    assert!(rooms.iter().all(|r| Arc::ptr_eq(r, &rooms[0])));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn get_unknown_room_is_not_found() {
    let registry = RoomRegistry::new(EvictionPolicy::Never);
    let err = registry.get(&RoomKey::pair("nope")).await.err().expect("should be missing");
    assert!(matches!(err, RoomError::NotFound(ref key) if key.id == "nope"));
    assert_eq!(crate::error::ErrorCode::error_code(&err), "E_ROOM_NOT_FOUND");
}

#[tokio::test]
async fn pair_and_group_namespaces_are_separate() {
    let registry = RoomRegistry::new(EvictionPolicy::Never);
    let pair = registry.get_or_create(&RoomKey::pair("same")).await;
    let group = registry.get_or_create(&RoomKey::study_group("same")).await;
    assert!(!Arc::ptr_eq(&pair, &group));
    assert!(group.lock().await.group.is_some());
    assert!(pair.lock().await.group.is_none());
}

#[tokio::test]
async fn create_group_uses_given_name() {
    let registry = RoomRegistry::new(EvictionPolicy::Never);
    let (id, name) = registry.create_group(Some("  Algorithms  ")).await;

    assert_eq!(name, "Algorithms");
    assert_eq!(id.len(), 9);
    let room = registry.get(&RoomKey::study_group(&id)).await.expect("created group exists");
    assert_eq!(room.lock().await.group.as_ref().map(|g| g.name.clone()), Some("Algorithms".into()));
}

#[tokio::test]
async fn create_group_blank_name_falls_back_to_default() {
    let registry = RoomRegistry::new(EvictionPolicy::Never);
    let (id, name) = registry.create_group(Some("   ")).await;
    assert_eq!(name, format!("Study Group {id}"));
}

#[tokio::test]
async fn list_filters_by_kind_and_sorts() {
    let registry = RoomRegistry::new(EvictionPolicy::Never);
    registry.get_or_create(&RoomKey::study_group("b")).await;
    registry.get_or_create(&RoomKey::study_group("a")).await;
    registry.get_or_create(&RoomKey::pair("p")).await;

    let groups = registry.list(RoomKind::StudyGroup).await;
    let ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(groups[0].name.as_deref(), Some("Study Group a"));

    let pairs = registry.list(RoomKind::Pair).await;
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].name.is_none());
}

#[tokio::test]
async fn reap_idle_removes_only_empty_idle_rooms() {
    let registry = RoomRegistry::new(EvictionPolicy::IdleAfter(Duration::ZERO));
    let empty = registry.get_or_create(&RoomKey::pair("empty")).await;
    let busy = registry.get_or_create(&RoomKey::pair("busy")).await;
    {
        let (id, tx, _rx) = test_helpers::connection();
        busy.lock().await.participants.push(Participant { id, name: id.to_string(), tx });
    }

    let reaped = registry.reap_idle(Duration::ZERO).await;

    assert_eq!(reaped, 1);
    assert!(empty.lock().await.evicted);
    assert!(!busy.lock().await.evicted);
    assert!(registry.get(&RoomKey::pair("empty")).await.is_err());
    assert!(registry.get(&RoomKey::pair("busy")).await.is_ok());
}

#[tokio::test]
async fn reap_idle_keeps_recently_active_rooms() {
    let registry = RoomRegistry::new(EvictionPolicy::IdleAfter(Duration::from_secs(3600)));
    registry.get_or_create(&RoomKey::pair("fresh")).await;

    assert_eq!(registry.reap_idle(Duration::from_secs(3600)).await, 0);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn reap_idle_skips_locked_rooms() {
    let registry = RoomRegistry::new(EvictionPolicy::IdleAfter(Duration::ZERO));
    let room = registry.get_or_create(&RoomKey::pair("held")).await;
    let guard = room.lock().await;

    assert_eq!(registry.reap_idle(Duration::ZERO).await, 0);
    drop(guard);
    assert_eq!(registry.reap_idle(Duration::ZERO).await, 1);
}

#[tokio::test]
async fn get_or_create_after_eviction_yields_fresh_room() {
    let registry = RoomRegistry::new(EvictionPolicy::IdleAfter(Duration::ZERO));
    let key = RoomKey::pair("again");
    let old = registry.get_or_create(&key).await;
    old.lock().await.code = "stale".into();

    registry.reap_idle(Duration::ZERO).await;
    let fresh = registry.get_or_create(&key).await;

    assert!(!Arc::ptr_eq(&old, &fresh));
    assert!(fresh.lock().await.code.is_empty());
}

#[test]
fn spawn_reaper_is_noop_for_never_policy() {
    let registry = RoomRegistry::new(EvictionPolicy::Never);
    assert!(spawn_reaper(registry, Duration::from_secs(1)).is_none());
}

#[test]
fn generated_ids_are_lowercase_base36() {
    for _ in 0..50 {
        let id = generate_room_id();
        assert_eq!(id.len(), 9);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}

#[tokio::test]
async fn spawned_reaper_evicts_empty_rooms() {
    let registry = RoomRegistry::new(EvictionPolicy::IdleAfter(Duration::ZERO));
    registry.get_or_create(&RoomKey::pair("idle")).await;

    let handle = spawn_reaper(registry.clone(), Duration::from_millis(10)).expect("reaper spawned");

    let mut remaining = registry.len().await;
    for _ in 0..50 {
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        remaining = registry.len().await;
    }
    handle.abort();
    assert_eq!(remaining, 0);
}
