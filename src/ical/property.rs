use std::collections::HashMap;

/// One logical content line split into its parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProperty {
    /// Upper-cased property name, empty when the line had no colon
    pub name: String,
    /// Parameters keyed by upper-cased name
    pub parameters: HashMap<String, String>,
    pub value: String,
}

impl RawProperty {
    /// Look up a parameter case-insensitively
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
    }
}

/// Parse `NAME;PARAM=value;...:VALUE`.
///
/// The split happens at the first colon outside a double-quoted parameter
/// value, or at the first colon at all when the quotes never close.
/// Parameter segments without `=` are skipped. A line without any colon
/// becomes a nameless property holding the whole line.
pub fn parse_property_line(line: &str) -> RawProperty {
    // An unbalanced quote hides every colon; split at the first one then
    let Some(colon) = find_unquoted(line, ':').or_else(|| line.find(':')) else {
        return RawProperty {
            value: line.to_string(),
            ..RawProperty::default()
        };
    };

    let (left, value) = (&line[..colon], &line[colon + 1..]);
    let mut segments = split_unquoted(left, ';').into_iter();
    let name = segments.next().unwrap_or_default().to_ascii_uppercase();

    let mut parameters = HashMap::new();
    for segment in segments {
        if let Some((key, param_value)) = segment.split_once('=') {
            parameters.insert(
                key.trim().to_ascii_uppercase(),
                param_value.trim_matches('"').to_string(),
            );
        }
    }

    RawProperty {
        name,
        parameters,
        value: value.to_string(),
    }
}

fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut quoted = false;
    for (idx, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == needle && !quoted => return Some(idx),
            _ => {}
        }
    }
    None
}

fn split_unquoted(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(idx) = find_unquoted(rest, separator) {
        parts.push(&rest[..idx]);
        rest = &rest[idx + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}
