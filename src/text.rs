//! Small text helpers shared by the list view and the editor commands.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

const ELLIPSIS: &str = "...";

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+").expect("valid regex"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:[-*+]|\d+\.)[ \t]+").expect("valid regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+)\*\*|__([^_\n]+)__").expect("valid regex"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid regex"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid regex"));

/// Cuts `text` to `max_chars` characters and appends `...` when anything was cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], ELLIPSIS),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlashCommandKind {
    Enhance,
    Shorten,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlashCommand {
    pub command: SlashCommandKind,
    pub args: Vec<String>,
}

impl SlashCommand {
    /// Target length of a `/shorten N` command.
    pub fn shorten_length(&self) -> Option<usize> {
        match self.command {
            SlashCommandKind::Shorten => self.args.first().and_then(|n| n.parse().ok()),
            SlashCommandKind::Enhance => None,
        }
    }
}

/// Parses the editor's slash commands. Only `/enhance` and
/// `/shorten <non-negative integer>` are recognized.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let mut tokens = input.split_whitespace();
    let command = match tokens.next()? {
        "/enhance" => SlashCommandKind::Enhance,
        "/shorten" => SlashCommandKind::Shorten,
        _ => return None,
    };
    let args: Vec<String> = tokens.map(str::to_string).collect();

    match (command, args.as_slice()) {
        (SlashCommandKind::Enhance, []) => {}
        (SlashCommandKind::Shorten, [n]) if n.parse::<usize>().is_ok() => {}
        _ => return None,
    }
    Some(SlashCommand { command, args })
}

/// Strips heading, list, emphasis and inline code markers, keeping line breaks.
pub fn extract_markdown_content(markdown: &str) -> String {
    let text = HEADING.replace_all(markdown, "");
    let text = LIST_ITEM.replace_all(&text, "");
    let text = BOLD.replace_all(&text, "$1$2");
    let text = ITALIC.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    text.into_owned()
}

/// Short display date, e.g. `Jan 15, 2024`.
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_text() {
        let text = "This is a very long text that should be truncated";
        assert_eq!(truncate_text(text, 20), "This is a very long ...");
    }

    #[test]
    fn keeps_short_text() {
        assert_eq!(truncate_text("Short text", 20), "Short text");
        assert_eq!(truncate_text("exactly", 7), "exactly");
        assert_eq!(truncate_text("", 0), "");
        assert_eq!(truncate_text("abc", 0), "...");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_text("héllo wörld", 4), "héll...");
    }

    #[test]
    fn parses_enhance() {
        assert_eq!(
            parse_slash_command("/enhance"),
            Some(SlashCommand {
                command: SlashCommandKind::Enhance,
                args: vec![],
            })
        );
    }

    #[test]
    fn parses_shorten_with_length() {
        let command = parse_slash_command("/shorten 100").unwrap();
        assert_eq!(command.command, SlashCommandKind::Shorten);
        assert_eq!(command.args, vec!["100".to_string()]);
        assert_eq!(command.shorten_length(), Some(100));
    }

    #[test]
    fn rejects_everything_else() {
        for input in [
            "not a command",
            "",
            "/shorten",
            "/shorten abc",
            "/shorten 10 20",
            "/enhance now",
            "/rewrite",
            "enhance",
        ] {
            assert_eq!(parse_slash_command(input), None, "{input:?}");
        }
    }

    #[test]
    fn strips_markdown_formatting() {
        let markdown = "# Header\n**Bold text** and *italic text*\n- List item";
        assert_eq!(
            extract_markdown_content(markdown),
            "Header\nBold text and italic text\nList item"
        );
    }

    #[test]
    fn strips_numbered_lists_and_code() {
        assert_eq!(extract_markdown_content("1. run `cargo`\n## Next"), "run cargo\nNext");
    }

    #[test]
    fn formats_dates() {
        let date: DateTime<Utc> = "2024-01-15T10:30:00Z".parse().unwrap();
        assert!(format_date(&date).contains("Jan 15, 2024"));
    }
}
