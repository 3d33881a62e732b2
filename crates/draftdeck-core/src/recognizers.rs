//! Line-level recognizers for agent CLI output.
//!
//! Each recognizer inspects one ANSI-stripped, complete line and yields at
//! most one event. They run in a fixed order and independently, so a single
//! line can produce several events. A non-match is silent.

use draftdeck_types::ParsedEvent;
use once_cell::sync::Lazy;
use regex::Regex;

/// A single-purpose line classifier.
pub type Recognizer = fn(&str) -> Option<ParsedEvent>;

/// A recognizer with the name used in trace output.
pub struct NamedRecognizer {
    pub name: &'static str,
    pub recognize: Recognizer,
}

/// The recognizer bank, in evaluation order.
pub static RECOGNIZERS: [NamedRecognizer; 5] = [
    NamedRecognizer { name: "file-change", recognize: recognize_file_change },
    NamedRecognizer { name: "session-id", recognize: recognize_session_id },
    NamedRecognizer { name: "token-cost", recognize: recognize_token_cost },
    NamedRecognizer { name: "component-path", recognize: recognize_component },
    NamedRecognizer { name: "cwd-change", recognize: recognize_cwd_change },
];

/// Roots a bare path line must start with to count as a directory change.
const CWD_ROOTS: &[&str] = &["Users", "home", "workspace", "root", "srv", "opt"];

/// Decoration a TUI may draw at the end of a path line: a pipe or any box-drawing glyph.
fn is_trailing_decoration(c: char) -> bool {
    c == '|' || ('\u{2500}'..='\u{257F}').contains(&c)
}

/// "Write file `content/post.md`", "Edited notes.txt", "Write(src/app.ts)"
static FILE_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:write|edit|created|updated|wrote)(?:\s+|\()(?:file\s+)?["'`]?([^\s"'`()]+\.\w+)["'`]?"#)
        .expect("Invalid file verb regex")
});

/// Any `content/...ext` path in the line.
static CONTENT_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:content)/\S+\.\w+").expect("Invalid content path regex")
});

static SESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Session:\s+([\w-]+)").expect("Invalid session regex")
});

/// "1,234 tokens", "12 token"
static TOKENS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)\s+tokens?\b").expect("Invalid tokens regex")
});

/// "$0.45", "$3"
static COST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\d+(?:\.\d+)?)").expect("Invalid cost regex")
});

/// Relative path with at least one directory, ending in .tsx or .jsx, preceded
/// by line start, whitespace or a quote.
static COMPONENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[\s"'`])((?:[\w.@-]+/)+[\w.-]+\.(?:tsx|jsx))\b"#)
        .expect("Invalid component regex")
});

static WORKTREE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Worktree (?:already exists|created):\s*(.+)$").expect("Invalid worktree regex")
});

static BARE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    let roots = CWD_ROOTS.join("|");
    Regex::new(&format!(r"^/(?:{roots})(?:/\S*)?$")).expect("Invalid bare path regex")
});

static FILE_EXTENSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.[A-Za-z0-9]+$").expect("Invalid file extension regex")
});

/// Run every recognizer over a stripped line, in order.
pub fn recognize_line(line: &str) -> Vec<ParsedEvent> {
    RECOGNIZERS
        .iter()
        .filter_map(|r| {
            let event = (r.recognize)(line)?;
            tracing::trace!(target: "draftdeck::parser", "{} matched: {:?}", r.name, event);
            Some(event)
        })
        .collect()
}

/// Verb-prefixed file write, falling back to a bare `content/` path.
pub fn recognize_file_change(line: &str) -> Option<ParsedEvent> {
    if let Some(caps) = FILE_VERB_RE.captures(line) {
        if let Some(path) = caps.get(1) {
            return Some(ParsedEvent::file_changed(path.as_str()));
        }
    }

    CONTENT_PATH_RE
        .find(line)
        .map(|m| ParsedEvent::file_changed(m.as_str()))
}

pub fn recognize_session_id(line: &str) -> Option<ParsedEvent> {
    let caps = SESSION_RE.captures(line)?;
    Some(ParsedEvent::session_id(caps.get(1)?.as_str()))
}

/// Token count and/or dollar cost. One event if either is present.
pub fn recognize_token_cost(line: &str) -> Option<ParsedEvent> {
    let tokens = TOKENS_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<u64>().ok());

    let cost = COST_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    if tokens.is_none() && cost.is_none() {
        return None;
    }
    Some(ParsedEvent::TokenCost { tokens, cost })
}

pub fn recognize_component(line: &str) -> Option<ParsedEvent> {
    let caps = COMPONENT_RE.captures(line)?;
    let path = caps.get(1)?.as_str();
    let name = component_name(path);
    if name.is_empty() {
        return None;
    }
    Some(ParsedEvent::ComponentFound {
        path: path.to_string(),
        name,
    })
}

/// Worktree banner, or a line holding nothing but an absolute directory path.
pub fn recognize_cwd_change(line: &str) -> Option<ParsedEvent> {
    if let Some(caps) = WORKTREE_RE.captures(line) {
        let dir = caps.get(1)?.as_str().trim();
        if dir.is_empty() {
            return None;
        }
        return Some(ParsedEvent::cwd_changed(dir));
    }

    let mut candidate = line.trim();
    if let Some(stripped) = candidate.strip_suffix(is_trailing_decoration) {
        candidate = stripped.trim_end();
    }

    if !BARE_PATH_RE.is_match(candidate) {
        return None;
    }

    let dir = candidate.trim_end_matches('/');
    // Looks like a file, not a directory.
    if FILE_EXTENSION_RE.is_match(dir) {
        return None;
    }
    Some(ParsedEvent::cwd_changed(dir))
}

/// PascalCase display name from a component path: `nav-bar_item.tsx` -> `NavBarItem`.
pub fn component_name(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    let stem = file
        .strip_suffix(".tsx")
        .or_else(|| file.strip_suffix(".jsx"))
        .unwrap_or(file);

    stem.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
