//! Streaming parser for agent CLI terminal output.
//!
//! Raw chunks are scanned for OSC 7 directory notifications, then appended to
//! a carry-over buffer. Every complete line is stripped of escape sequences and
//! run through the recognizer bank. Events are delivered synchronously to the
//! parser's subscribers as they are produced.

use crate::ansi::strip_ansi_codes;
use crate::emitter::{EventEmitter, Subscription};
use crate::osc7::CwdTracker;
use crate::recognizers::recognize_line;
use draftdeck_types::ParsedEvent;
use tracing::{debug, trace};

/// Parser for one terminal session's output stream.
///
/// Not meant to be fed concurrently; each PTY session owns its own instance.
#[derive(Debug, Default)]
pub struct OutputParser {
    /// Unconsumed tail since the last newline. Never contains '\n'.
    buffer: String,
    cwd_tracker: CwdTracker,
    emitter: EventEmitter,
}

impl OutputParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that delivers to an existing listener set.
    pub fn with_emitter(emitter: EventEmitter) -> Self {
        Self {
            emitter,
            ..Self::default()
        }
    }

    /// Register a listener for events produced by [`feed`](Self::feed).
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ParsedEvent) + Send + Sync + 'static,
    {
        self.emitter.subscribe(callback)
    }

    /// The listener set this parser delivers to.
    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Feed a chunk of terminal output.
    ///
    /// Events are delivered to subscribers before this returns, and are also
    /// returned in delivery order. An empty chunk is a no-op.
    pub fn feed(&mut self, chunk: &str) -> Vec<ParsedEvent> {
        let mut events = Vec::new();
        if chunk.is_empty() {
            return events;
        }

        for dir in self.cwd_tracker.scan(chunk) {
            self.deliver(ParsedEvent::cwd_changed(dir), &mut events);
        }

        self.buffer.push_str(chunk);
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return events;
        };

        let remainder = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, remainder);

        for line in complete[..last_newline].split('\n') {
            for event in Self::parse_line(line) {
                self.deliver(event, &mut events);
            }
        }

        events
    }

    /// Strip a single complete line and run the recognizer bank over it.
    pub fn parse_line(line: &str) -> Vec<ParsedEvent> {
        let stripped = strip_ansi_codes(line);
        if stripped.trim().is_empty() {
            return Vec::new();
        }
        trace!(target: "draftdeck::parser", "Line: {}", stripped);
        recognize_line(&stripped)
    }

    /// Incomplete trailing text waiting for a newline.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Discard buffered text and any partial OSC 7 sequence.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cwd_tracker.reset();
    }

    /// Remove every subscriber.
    pub fn clear_listeners(&self) {
        self.emitter.clear();
    }

    fn deliver(&self, event: ParsedEvent, events: &mut Vec<ParsedEvent>) {
        debug!(target: "draftdeck::parser", "Emitting {} event", event.kind());
        self.emitter.emit(&event);
        events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collecting_parser() -> (OutputParser, Arc<Mutex<Vec<ParsedEvent>>>) {
        let parser = OutputParser::new();
        let seen: Arc<Mutex<Vec<ParsedEvent>>> = Arc::default();
        let sink = seen.clone();
        parser.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        (parser, seen)
    }

    #[test]
    fn test_no_event_on_incomplete_line() {
        let (mut parser, seen) = collecting_parser();

        assert!(parser.feed("Session: abc").is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(parser.buffered(), "Session: abc");

        let events = parser.feed("-123\n");
        assert_eq!(events, vec![ParsedEvent::session_id("abc-123")]);
        assert_eq!(*seen.lock().unwrap(), events);
        assert_eq!(parser.buffered(), "");
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (mut parser, seen) = collecting_parser();
        parser.feed("Wrote file content/blog/2025-01-intro.md\nSession: abc123\n1,234 tokens Â· $0.45\n");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ParsedEvent::file_changed("content/blog/2025-01-intro.md"),
                ParsedEvent::session_id("abc123"),
                ParsedEvent::TokenCost { tokens: Some(1234), cost: Some(0.45) },
            ]
        );
    }

    #[test]
    fn test_ansi_stripped_before_matching() {
        let mut parser = OutputParser::new();
        let events = parser.feed("\x1b[1m1,234\x1b[22m \x1b[2mtokens\x1b[0m · \x1b[32m$0.45\x1b[0m\r\n");
        assert_eq!(
            events,
            vec![ParsedEvent::TokenCost { tokens: Some(1234), cost: Some(0.45) }]
        );
    }

    #[test]
    fn test_osc7_emits_cwd_changed() {
        let mut parser = OutputParser::new();
        let events = parser.feed("\x1b]7;file://host/Users/a%20b/proj\x07");
        assert_eq!(events, vec![ParsedEvent::cwd_changed("/Users/a b/proj")]);
    }

    #[test]
    fn test_osc7_before_line_events() {
        let mut parser = OutputParser::new();
        let events = parser.feed("Session: s1\n\x1b]7;file://h/home/dev\x07");
        assert_eq!(
            events,
            vec![ParsedEvent::cwd_changed("/home/dev"), ParsedEvent::session_id("s1")]
        );
    }

    #[test]
    fn test_osc7_not_repeated_by_line_recognizers() {
        let mut parser = OutputParser::new();
        let events = parser.feed("\x1b]7;file://h/home/dev/site\x07\n");
        assert_eq!(events, vec![ParsedEvent::cwd_changed("/home/dev/site")]);
    }

    #[test]
    fn test_verb_precedence_single_event() {
        let mut parser = OutputParser::new();
        let events = parser.feed("Write file \"content/linkedin/post.md\"\n");
        assert_eq!(events, vec![ParsedEvent::file_changed("content/linkedin/post.md")]);
    }

    #[test]
    fn test_component_and_file_from_one_line() {
        let mut parser = OutputParser::new();
        let events = parser.feed("Edit src/components/hero-card.tsx\n");
        assert_eq!(
            events,
            vec![
                ParsedEvent::file_changed("src/components/hero-card.tsx"),
                ParsedEvent::ComponentFound {
                    path: "src/components/hero-card.tsx".to_string(),
                    name: "HeroCard".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_bare_path_lines() {
        let mut parser = OutputParser::new();
        assert!(parser.feed("/Users/me/project/notes.txt\n").is_empty());
        assert_eq!(
            parser.feed("/Users/me/project\n"),
            vec![ParsedEvent::cwd_changed("/Users/me/project")]
        );
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let (mut parser, seen) = collecting_parser();
        parser.feed("partial");
        assert!(parser.feed("").is_empty());
        assert_eq!(parser.buffered(), "partial");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_chunk_ending_on_newline_leaves_empty_buffer() {
        let mut parser = OutputParser::new();
        parser.feed("one\ntwo\n");
        assert_eq!(parser.buffered(), "");
        parser.feed("three\nfour");
        assert_eq!(parser.buffered(), "four");
    }

    #[test]
    fn test_byte_by_byte_matches_single_feed() {
        let text = "\x1b]7;file://h/srv/site\x07Wrote content/a.md\r\nSession: x-1\n\x1b[33m$1.25\x1b[0m\n";

        let mut whole = OutputParser::new();
        let expected = whole.feed(text);

        let mut split = OutputParser::new();
        let mut actual = Vec::new();
        for ch in text.chars() {
            actual.extend(split.feed(ch.encode_utf8(&mut [0u8; 4])));
        }

        assert_eq!(actual, expected);
        assert_eq!(expected.len(), 4);
    }

    #[test]
    fn test_reset_discards_partial_state() {
        let mut parser = OutputParser::new();
        parser.feed("Session: ab");
        parser.feed("\x1b]7;file://h/opt/x");
        parser.reset();
        assert_eq!(parser.buffered(), "");
        assert!(parser.feed("\x07c\n").is_empty());
    }

    #[test]
    fn test_clear_listeners() {
        let (mut parser, seen) = collecting_parser();
        parser.clear_listeners();
        assert_eq!(parser.feed("Session: s\n").len(), 1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_shared_emitter() {
        let emitter = EventEmitter::new();
        let seen: Arc<Mutex<Vec<ParsedEvent>>> = Arc::default();
        let sink = seen.clone();
        emitter.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let mut parser = OutputParser::with_emitter(emitter.clone());
        parser.feed("Session: shared\n");
        assert_eq!(*seen.lock().unwrap(), vec![ParsedEvent::session_id("shared")]);
        assert_eq!(parser.emitter().listener_count(), 1);
    }
}
