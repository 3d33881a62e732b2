//! Captured transcripts replayed through the parser.

#[path = "../../../tests/common/mod.rs"]
mod common;

use common::{load_transcript, sorted_json, transcript_path};
use draftdeck_core::{replay_bytes, replay_file, OutputParser};
use draftdeck_types::ParsedEvent;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

fn agent_session_events() -> Vec<ParsedEvent> {
    vec![
        ParsedEvent::cwd_changed("/home/dev/site"),
        ParsedEvent::cwd_changed("/home/dev/site/packages/web app"),
        ParsedEvent::session_id("7f3a-91bc"),
        ParsedEvent::file_changed("content/blog/hello-world.md"),
        ParsedEvent::file_changed("content/blog/hello-world.md"),
        ParsedEvent::file_changed("src/components/hero-card.tsx"),
        ParsedEvent::ComponentFound {
            path: "src/components/hero-card.tsx".to_string(),
            name: "HeroCard".to_string(),
        },
        ParsedEvent::TokenCost {
            tokens: Some(1234),
            cost: Some(0.45),
        },
        ParsedEvent::cwd_changed("/home/dev/site-feature"),
        ParsedEvent::cwd_changed("/home/dev/site/packages"),
    ]
}

#[test]
fn test_agent_session_single_chunk() {
    let events = replay_bytes(&load_transcript("agent_session"), 0);
    assert_eq!(events, agent_session_events());
}

#[test]
fn test_agent_session_from_file() {
    let events = replay_file(&transcript_path("agent_session"), 0).unwrap();
    assert_eq!(events, agent_session_events());
}

#[test]
fn test_plain_shell_yields_nothing() {
    assert!(replay_bytes(&load_transcript("plain_shell"), 0).is_empty());
    assert!(replay_bytes(&load_transcript("plain_shell"), 1).is_empty());
}

#[test]
fn test_byte_by_byte_keeps_line_order() {
    let events = replay_bytes(&load_transcript("agent_session"), 1);
    let kinds: Vec<&str> = events.iter().map(|e| e.kind().as_str()).collect();
    assert_eq!(
        kinds,
        vec![
            "cwd-changed",
            "session-id",
            "file-changed",
            "file-changed",
            "file-changed",
            "component-found",
            "cwd-changed",
            "token-cost",
            "cwd-changed",
            "cwd-changed",
        ]
    );
}

#[test]
fn test_subscribers_see_returned_events() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut parser = OutputParser::new();
    let sink = seen.clone();
    parser.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    let text = String::from_utf8(load_transcript("agent_session")).unwrap();
    let returned = parser.feed(&text);

    assert_eq!(*seen.lock().unwrap(), returned);
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_events(chunk_size in 1usize..96) {
        let transcript = load_transcript("agent_session");
        let whole = replay_bytes(&transcript, 0);
        let chunked = replay_bytes(&transcript, chunk_size);
        prop_assert_eq!(sorted_json(&chunked), sorted_json(&whole));
    }

    #[test]
    fn prop_arbitrary_split_points(splits in proptest::collection::vec(0usize..400, 0..8)) {
        let text = String::from_utf8(load_transcript("agent_session")).unwrap();
        let whole = OutputParser::new().feed(&text);

        let mut points: Vec<usize> = splits
            .into_iter()
            .map(|p| p.min(text.len()))
            .filter(|p| text.is_char_boundary(*p))
            .collect();
        points.push(text.len());
        points.sort_unstable();

        let mut parser = OutputParser::new();
        let mut events = Vec::new();
        let mut start = 0;
        for end in points {
            events.extend(parser.feed(&text[start..end]));
            start = end;
        }
        prop_assert_eq!(sorted_json(&events), sorted_json(&whole));
    }
}
