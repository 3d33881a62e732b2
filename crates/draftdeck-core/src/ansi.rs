//! Terminal control sequence stripping.

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for terminal escape sequences.
/// Matches:
/// - CSI sequences: ESC [ or C1 0x9B, params, intermediates, final byte
/// - OSC sequences: ESC ] or C1 0x9D ... BEL, ESC \ or C1 ST
/// - DCS/SOS/PM/APC strings: ESC P/X/^/_ ... ESC \ or BEL
/// - Character set designation: ESC ( ) * + followed by a character
/// - Two-byte escapes: ESC = ESC > ESC 7 ESC 8 ESC M etc.
///
/// An introducer with no terminator is not matched, so a truncated sequence
/// never swallows the printable text after it.
static ANSI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:\x1b\[|\x{9b})[0-?]*[ -/]*[@-~]",
        r"|(?:\x1b\]|\x{9d})[^\x07\x1b\x{9c}]*(?:\x07|\x1b\\|\x{9c})",
        r"|\x1b[PX^_][^\x07\x1b]*(?:\x07|\x1b\\)",
        r"|\x1b[()*+][0-9A-Za-z]",
        r"|\x1b[=>78cDEHMNOZ]",
    ))
    .expect("Invalid ANSI regex")
});

/// Strip terminal escape sequences from a line.
pub fn strip_ansi_codes(text: &str) -> String {
    ANSI_REGEX.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_sgr_colors() {
        let input = "\x1b[32mHello\x1b[0m World";
        assert_eq!(strip_ansi_codes(input), "Hello World");
    }

    #[test]
    fn test_strip_cursor_and_private_modes() {
        let input = "\x1b[?25l\x1b[2K\x1b[1G> ready\x1b[?25h";
        assert_eq!(strip_ansi_codes(input), "> ready");
    }

    #[test]
    fn test_strip_osc_title_and_hyperlink() {
        let input = "\x1b]0;agent\x07\x1b]8;;https://example.com\x1b\\link\x1b]8;;\x1b\\";
        assert_eq!(strip_ansi_codes(input), "link");
    }

    #[test]
    fn test_strip_c1_csi() {
        let input = "\u{9b}1mbold\u{9b}0m";
        assert_eq!(strip_ansi_codes(input), "bold");
    }

    #[test]
    fn test_strip_charset_and_keypad() {
        let input = "\x1b(B\x1b=text\x1b>";
        assert_eq!(strip_ansi_codes(input), "text");
    }

    #[test]
    fn test_numbers_inside_sequences_removed() {
        let input = "\x1b[38;5;208m1,234\x1b[0m tokens";
        assert_eq!(strip_ansi_codes(input), "1,234 tokens");
    }

    #[test]
    fn test_unterminated_csi_left_alone() {
        let input = "\x1b[12;$0.45 spent";
        assert_eq!(strip_ansi_codes(input), input);
    }

    #[test]
    fn test_unterminated_osc_does_not_eat_text() {
        let input = "\x1b]0;title without end Session: abc";
        assert_eq!(strip_ansi_codes(input), input);
    }

    #[test]
    fn test_plain_text_untouched() {
        let input = "Wrote file content/blog/2025-01-intro.md [done]";
        assert_eq!(strip_ansi_codes(input), input);
    }
}
