/// Normalize line endings and rejoin folded continuation lines.
///
/// A newline followed by a space or tab marks a continuation: both characters
/// are dropped and the rest is appended to the previous line as-is. Each
/// resulting line is trimmed and blank lines are skipped.
pub fn unfold_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut joined = String::with_capacity(normalized.len());
    let mut chars = normalized.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' && matches!(chars.peek(), Some(' ') | Some('\t')) {
            chars.next();
            continue;
        }
        joined.push(c);
    }

    joined
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_is_joined_without_separator() {
        assert_eq!(unfold_lines("SUMMARY:Long t\n ext"), vec!["SUMMARY:Long text"]);
        assert_eq!(unfold_lines("SUMMARY:Long t\r\n\text"), vec!["SUMMARY:Long text"]);
    }

    #[test]
    fn test_line_endings_normalized() {
        let lines = unfold_lines("BEGIN:VEVENT\r\nUID:1\rEND:VEVENT\n");
        assert_eq!(lines, vec!["BEGIN:VEVENT", "UID:1", "END:VEVENT"]);
    }

    #[test]
    fn test_blank_lines_dropped_and_trimmed() {
        let lines = unfold_lines("\n\n  BEGIN:VCALENDAR  \n\n\nEND:VCALENDAR\n   \n");
        assert_eq!(lines, vec!["BEGIN:VCALENDAR", "END:VCALENDAR"]);
    }

    #[test]
    fn test_leading_continuation_degrades() {
        // Nothing to join onto; the marker is still removed
        assert_eq!(unfold_lines("\n SUMMARY:x"), vec!["SUMMARY:x"]);
        assert!(unfold_lines("").is_empty());
    }
}
