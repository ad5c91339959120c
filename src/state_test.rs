use super::*;

#[test]
fn pair_room_starts_empty_javascript() {
    let room = RoomState::new(RoomKey::pair("abc123"));
    assert!(room.code.is_empty());
    assert_eq!(room.language, Language::Javascript);
    assert!(room.participants.is_empty());
    assert!(room.group.is_none());
    assert!(!room.evicted);
}

#[test]
fn study_group_room_has_default_name_and_empty_logs() {
    let room = RoomState::new(RoomKey::study_group("g1"));
    let group = room.group.as_ref().expect("study group carries a log");
    assert_eq!(group.name, "Study Group g1");
    assert!(group.messages.is_empty());
    assert!(group.questions.is_empty());
}

#[test]
fn room_key_display_includes_kind() {
    assert_eq!(RoomKey::pair("abc").to_string(), "pair/abc");
    assert_eq!(RoomKey::study_group("abc").to_string(), "study_group/abc");
}

#[test]
fn room_keys_with_same_id_differ_by_kind() {
    assert_ne!(RoomKey::pair("x"), RoomKey::study_group("x"));
}

#[test]
fn language_serde_lowercase() {
    assert_eq!(serde_json::to_string(&Language::Cpp).unwrap(), "\"cpp\"");
    assert_eq!(serde_json::from_str::<Language>("\"java\"").unwrap(), Language::Java);
    assert!(serde_json::from_str::<Language>("\"Python\"").is_err());
}

#[test]
fn membership_lookup_by_connection() {
    let mut room = RoomState::new(RoomKey::study_group("g"));
    let (id, tx, _rx) = test_helpers::connection();
    room.participants.push(Participant { id, name: "ada".into(), tx });

    assert!(room.is_member(id));
    assert_eq!(room.participant(id).map(|p| p.name.as_str()), Some("ada"));
    assert!(!room.is_member(Uuid::new_v4()));
}

#[test]
fn touch_advances_last_activity() {
    let mut room = RoomState::new(RoomKey::pair("t"));
    let before = room.last_activity;
    std::thread::sleep(std::time::Duration::from_millis(2));
    room.touch();
    assert!(room.last_activity > before);
}
