//! Integration tests for single-export conversion.
//!
//! These exercise the public API end to end: JSON in, Markdown out.

use std::fs;

use chatdown::prelude::*;
use tempfile::tempdir;

fn converter() -> MarkdownConverter {
    MarkdownConverter::with_config(ConvertConfig::new().with_date_policy(DatePolicy::BestEffortOrRaw))
}

// ============================================================================
// Documented scenarios
// ============================================================================

#[test]
fn test_zero_id_and_escaped_body() {
    let json = r#"{
        "name": "Chat",
        "type": "personal_chat",
        "id": 0,
        "messages": [
            {"type": "message", "date": "2023-01-01T10:00:00", "from": "Alice", "text": "Hello *world*"}
        ]
    }"#;

    let md = converter().convert_str(json).unwrap();
    assert_eq!(
        md,
        "# Chat\n\n\
         **Type:** personal_chat  \n\
         **Messages:** 1  \n\n\
         ---\n\n\
         ## 2023-01-01 10:00:00 - Alice\n\n\
         Hello \\*world\\*\n\n\
         \n---\n\n\n"
    );
}

#[test]
fn test_span_sequence_spacing() {
    let json = r#"{"name": "C", "messages": [
        {"type": "message", "from": "A", "text": ["Hi ", {"type": "bold", "text": "there"}]}
    ]}"#;

    let md = converter().convert_str(json).unwrap();
    assert!(md.contains("##  - A\n\nHi **there**\n\n"), "{md}");
}

#[test]
fn test_contentless_service_message_vanishes() {
    let with = r#"{"name": "C", "type": "t", "messages": [
        {"type": "message", "from": "A", "text": "one"},
        {"type": "service", "action": "", "text": ""},
        {"type": "message", "from": "B", "text": "two"}
    ]}"#;
    let without = r#"{"name": "C", "type": "t", "messages": [
        {"type": "message", "from": "A", "text": "one"},
        {"type": "message", "from": "B", "text": "two"}
    ]}"#;

    let config = ConvertConfig::new().with_metadata(false);
    let conv = MarkdownConverter::with_config(config);
    assert_eq!(conv.convert_str(with).unwrap(), conv.convert_str(without).unwrap());
}

// ============================================================================
// Full documents
// ============================================================================

#[test]
fn test_rich_export_block_order() {
    let json = r#"{
        "name": "Trip",
        "type": "private_group",
        "id": 4242,
        "messages": [
            {
                "id": 1, "type": "message", "date": "2024-05-01 08:30:00", "from": "Ann",
                "text": ["Plan: ", {"type": "italic", "text": "beach"}, " + ", {"type": "code", "text": "sunscreen"}],
                "photo": "photos/photo_1@01-05-2024.jpg", "width": 1280, "height": 960,
                "poll": {"question": "When?", "closed": true, "total_voters": 3,
                         "answers": [{"text": "Morning", "voters": 2, "chosen": true},
                                     {"text": "Evening", "voters": 1, "chosen": false}]},
                "contact_information": {"first_name": "Lifeguard", "last_name": "", "phone_number": "112", "user_id": 0},
                "location_information": {"latitude": 43.7, "longitude": 7.25},
                "forwarded_from": "Travel Channel",
                "reply_to_message_id": 7,
                "via_bot": "weatherbot"
            }
        ]
    }"#;

    let md = converter().convert_str(json).unwrap();

    assert!(md.starts_with("# Trip\n\n**Type:** private_group  \n**ID:** 4242  \n**Messages:** 1  \n\n---\n\n"));
    assert!(md.contains("## 2024-05-01 08:30:00 - Ann\n\nPlan: *beach* \\+ `sunscreen`\n\n"));

    let order = [
        "Plan:",
        "📷 **Photo:** photo_1@01-05-2024.jpg (1280x960)",
        "📊 **Poll**\n\n**Question:** When?\n\n**Options:**\n- ☑ Morning (2 votes)\n- ☐ Evening (1 votes)\n\n*Poll is closed*\n**Total voters:** 3\n\n",
        "📞 **Contact**\n\n**Name:** Lifeguard \n**Phone:** 112\n\n",
        "📍 **Location**\n\n**Coordinates:** 43.700000, 7.250000\n**Map Link:** https://maps.google.com/?q=43.700000,7.250000\n\n",
        "\n*Forwarded from: Travel Channel*\n",
        "\n*Reply to message ID: 7*\n",
        "\n*Via bot: weatherbot*\n",
    ];
    let mut cursor = 0;
    for needle in order {
        let pos = md[cursor..]
            .find(needle)
            .unwrap_or_else(|| panic!("missing or out of order: {needle:?}\n{md}"));
        cursor += pos + needle.len();
    }
    assert!(md.ends_with("*Via bot: weatherbot*\n\n---\n\n\n"));
}

#[test]
fn test_service_events() {
    let json = r#"{"name": "G", "type": "private_group", "messages": [
        {"type": "service", "date": "2024-01-01T00:00:00", "actor": "Ann", "action": "invite_members", "members": ["Bob", null, "Cy"]},
        {"type": "service", "date": "2024-01-01T00:00:01", "actor": "Ann", "action": "edit_group_title", "title": "New name"},
        {"type": "service", "date": "2024-01-01T00:00:02", "action": "join_group_by_link", "inviter": "Bob"}
    ]}"#;

    let md = converter().convert_str(json).unwrap();
    assert!(md.contains("*invite_members* by Ann - Members: Bob, , Cy\n\n"));
    assert!(md.contains("*edit_group_title* by Ann - Title: New name\n\n"));
    assert!(md.contains("*join_group_by_link* - Invited by: Bob\n\n"));
}

#[test]
fn test_unknown_kinds_render_as_regular() {
    let json = r#"{"name": "C", "messages": [
        {"type": "sticker_message", "from": "A", "text": ["x ", {"type": "blockquote", "text": "quoted."}]}
    ]}"#;

    let md = converter().convert_str(json).unwrap();
    assert!(md.contains("##  - A\n\nx quoted\\.\n\n"));
}

#[test]
fn test_media_toggle() {
    let json = r#"{"name": "C", "messages": [
        {"type": "message", "from": "A", "text": "look", "file": "files/report.pdf", "mime_type": "application/pdf"},
        {"type": "message", "from": "A", "text": "", "file": "voice/a.ogg", "media_type": "voice_message", "duration_seconds": 12}
    ]}"#;

    let with_media = converter().convert_str(json).unwrap();
    assert!(with_media.contains("📎 **File:** report.pdf (application/pdf)\n\n"));
    assert!(with_media.contains("📎 **File:** a.ogg - Duration: 12 seconds\n\n🎬 **Media Type:** voice_message\n\n"));

    let conv = MarkdownConverter::with_config(ConvertConfig::new().with_media(false));
    let without = conv.convert_str(json).unwrap();
    assert!(!without.contains("📎"));
    assert!(!without.contains("🎬"));
    assert!(without.contains("look"));
}

#[test]
fn test_custom_date_format() {
    let json = r#"{"name": "C", "messages": [
        {"type": "message", "date": "2023-12-31T23:59:59", "from": "A", "text": "bye"}
    ]}"#;

    let conv = MarkdownConverter::with_config(ConvertConfig::new().with_date_format("%d.%m.%Y %H:%M"));
    assert!(conv.convert_str(json).unwrap().contains("## 31.12.2023 23:59 - A\n\n"));
}

#[test]
fn test_unparseable_date_policies() {
    let json = r#"{"name": "C", "messages": [
        {"type": "message", "date": "last tuesday", "from": "A", "text": "hm"}
    ]}"#;

    let raw = converter().convert_str(json).unwrap();
    assert!(raw.contains("## last tuesday - A\n\n"));

    let now = MarkdownConverter::new().convert_str(json).unwrap();
    assert!(!now.contains("last tuesday"));
    assert!(now.contains(" - A\n\nhm\n\n"));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_convert_file_writes_markdown() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("result.json");
    let output = destination_path(&input);
    fs::write(&input, r#"{"name": "File Chat", "messages": []}"#).unwrap();

    converter().convert_file(&input, &output).unwrap();

    let md = fs::read_to_string(&output).unwrap();
    assert!(md.starts_with("# File Chat\n\n"));
    assert!(md.contains("**Messages:** 0  \n"));
}

#[test]
fn test_convert_file_invalid_json_names_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.json");
    fs::write(&input, "{\"name\": \"oops\", \"messages\": [").unwrap();

    let err = converter().convert_file(&input, dir.path().join("broken.md")).unwrap_err();
    assert!(err.is_parse());
    assert!(err.to_string().contains("broken.json"));
    assert!(!dir.path().join("broken.md").exists());
}

#[test]
fn test_convert_file_missing_input() {
    let dir = tempdir().unwrap();
    let err = converter()
        .convert_file(dir.path().join("absent.json"), dir.path().join("absent.md"))
        .unwrap_err();
    assert!(err.is_io());
}
