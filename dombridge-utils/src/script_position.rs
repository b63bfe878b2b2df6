//! Line and column arithmetic over script text, and the position reports
//! used in parser and validation diagnostics.
//!
//! Positions are character indices (not byte offsets). Lines and columns
//! are 1-based.

/// Characters collapsed into a single space in report snippets.
pub const WHITESPACE: &[char] = &[' ', '\t', '\r', '\n'];

/// Length of the text snippets included in [`report_position`].
pub const SNIPPET_LENGTH: usize = 70;

/// The line containing `position`.
pub fn line(script: &str, position: usize) -> usize {
    script.chars().take(position).filter(|&c| c == '\n').count() + 1
}

/// The column of `position` within its line.
pub fn column(script: &str, position: usize) -> usize {
    if position == 0 {
        return 1;
    }
    let last_newline = script
        .chars()
        .take(position)
        .enumerate()
        .filter(|&(_, c)| c == '\n')
        .map(|(index, _)| index)
        .last();
    match last_newline {
        Some(newline) => position - newline,
        None => position + 1,
    }
}

/// The position of `line` and `column`.
///
/// When the script has fewer lines than `line`, the column is counted from
/// the start of the last line.
pub fn position(script: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    let mut remaining = line;
    for (index, c) in script.chars().enumerate() {
        if remaining <= 1 {
            break;
        }
        if c == '\n' {
            line_start = index + 1;
            remaining -= 1;
        }
    }
    line_start + column.saturating_sub(1)
}

fn normalize(text: &str) -> String {
    text.split(WHITESPACE)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text starting at `position` with whitespace runs collapsed, cut to
/// `max_len` characters followed by `...`.
pub fn following_text(script: &str, position: usize, max_len: usize) -> String {
    let text: String = script.chars().skip(position).collect();
    let text = normalize(&text);
    if text.chars().count() > max_len {
        let mut cut: String = text.chars().take(max_len).collect();
        cut.push_str("...");
        cut
    } else {
        text
    }
}

/// Text before `position` with whitespace runs collapsed, keeping the last
/// `max_len` characters preceded by `...`.
pub fn previous_text(script: &str, position: usize, max_len: usize) -> String {
    if position == 0 {
        return String::new();
    }
    let text: String = script.chars().take(position).collect();
    let text = normalize(&text);
    let count = text.chars().count();
    if count > max_len {
        let tail: String = text.chars().skip(count - max_len).collect();
        format!("...{tail}")
    } else {
        text
    }
}

/// Describes `line` and `column` of `script` with the surrounding text.
///
/// ```
/// use dombridge_utils::script_position::report_position;
///
/// let report = report_position("Module Demo;\nEntity X", 2, 1, Some("demo.dsl"));
/// assert_eq!(
///     report,
///     "At line 2, column 1, file 'demo.dsl',\r\nafter: \"Module Demo;\",\r\nbefore: \"Entity X\"."
/// );
/// ```
pub fn report_position(script: &str, line: usize, column: usize, file: Option<&str>) -> String {
    let at = position(script, line, column);
    let file = file
        .map(|path| format!(" file '{path}',"))
        .unwrap_or_default();
    format!(
        "At line {line}, column {column},{file}\r\nafter: \"{}\",\r\nbefore: \"{}\".",
        previous_text(script, at, SNIPPET_LENGTH),
        following_text(script, at, SNIPPET_LENGTH),
    )
}

/// [`report_position`] for a character position, clamped to the script length.
pub fn report_position_at(script: &str, position: usize, file: Option<&str>) -> String {
    let position = position.min(script.chars().count());
    report_position(
        script,
        line(script, position),
        column(script, position),
        file,
    )
}
