//! Plain-text derivations of note content (titles and excerpts).

use std::sync::LazyLock;

use regex::Regex;

/// Separator used in place of line breaks inside excerpts.
pub const EXCERPT_LINE_SEPARATOR: &str = "   ";

/// Maximum excerpt length in characters.
pub const EXCERPT_MAX_CHARS: usize = 200;

const CHECKBOX_CHECKED_EMOJI: &str = "☑";
const CHECKBOX_UNCHECKED_EMOJI: &str = "☐";
const LIST_SYMBOLS: [char; 3] = ['-', '*', '+'];

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[*+-]\s+").expect("Invalid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s+(.*?)\s*#*$").expect("Invalid regex"));
static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:=+|-+)$").expect("Invalid regex"));
static LEADING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]+").expect("Invalid regex"));
static TRAILING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").expect("Invalid regex"));
static EMPHASIS: LazyLock<[Regex; 6]> = LazyLock::new(|| {
    [
        r"\*\*\*(.*?)\*\*\*",
        r"___(.*?)___",
        r"\*\*(.*?)\*\*",
        r"__(.*?)__",
        r"\*(.*?)\*",
        r"_(.*?)_",
    ]
    .map(|pattern| Regex::new(pattern).expect("Invalid regex"))
});

fn checkbox(symbol: char, checked: bool) -> String {
    if checked {
        format!("{symbol} [x]")
    } else {
        format!("{symbol} [ ]")
    }
}

/// Strip the markdown markup a note title or excerpt should not show.
pub fn remove_markdown(text: &str) -> String {
    let mut text = text.to_string();
    for symbol in LIST_SYMBOLS {
        text = text
            .replace(&format!("{} ", checkbox(symbol, true)), "")
            .replace(&format!("{} ", checkbox(symbol, false)), "")
            .replace(&checkbox(symbol, true), "")
            .replace(&checkbox(symbol, false), "");
    }
    let text = LIST_ITEM.replace_all(&text, "");
    let text = HEADING.replace_all(&text, "$1");
    let text = HEADING_LINE.replace_all(&text, "");
    let mut text = text.into_owned();
    for pattern in EMPHASIS.iter() {
        text = pattern.replace_all(&text, "$1").into_owned();
    }
    let text = LEADING_SPACE.replace_all(&text, "");
    TRAILING_SPACE.replace_all(&text, "").into_owned()
}

/// Replace markdown checkboxes with their emoji counterparts.
pub fn replace_checkboxes_with_emojis(text: &str) -> String {
    text.lines()
        .map(|line| {
            let mut line = line.to_string();
            for symbol in LIST_SYMBOLS {
                line = line
                    .replace(&checkbox(symbol, true), CHECKBOX_CHECKED_EMOJI)
                    .replace(&checkbox(symbol, false), CHECKBOX_UNCHECKED_EMOJI);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_empty_line(line: &str) -> bool {
    remove_markdown(line).trim().is_empty()
}

/// Generate a title from the first line that is not empty once markdown is removed.
pub fn generate_note_title(content: &str) -> String {
    content
        .split('\n')
        .find(|line| !is_empty_line(line))
        .map(remove_markdown)
        .unwrap_or_default()
}

/// Generate the excerpt shown in note lists.
///
/// When the content starts with `title`, the excerpt starts after it.
pub fn generate_note_excerpt(content: &str, title: Option<&str>) -> String {
    let content = remove_markdown(&replace_checkboxes_with_emojis(content.trim()));
    if content.is_empty() {
        return String::new();
    }

    let title = title
        .map(|title| remove_markdown(&replace_checkboxes_with_emojis(title.trim())))
        .filter(|title| !title.is_empty());
    let content = match title {
        Some(title) => content
            .strip_prefix(title.as_str())
            .map_or(content.as_str(), |rest| rest)
            .to_string(),
        None => content,
    };

    content
        .trim()
        .chars()
        .take(EXCERPT_MAX_CHARS)
        .collect::<String>()
        .replace('\n', EXCERPT_LINE_SEPARATOR)
}
