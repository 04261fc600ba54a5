//! Deterministic name derivation.
//!
//! Every function here is pure and total: the same input always yields the
//! same output, with no configuration or ambient state. The resolver leans on
//! these to derive Go identifiers, JSON tags, plural forms, and physical
//! table/column names from the names written in the specification.

use crate::spec::FieldType;

/// Go initialisms that stay fully uppercase in exported identifiers.
const INITIALISMS: &[&str] = &["api", "db", "http", "id", "json", "sql", "url", "uuid"];

/// Irregular plural forms not covered by the `-s`/`-es`/`-ies` rules.
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("child", "children"),
    ("man", "men"),
    ("person", "people"),
    ("woman", "women"),
];

/// Convert a name to `snake_case`.
///
/// Accepts camelCase, PascalCase, space- and hyphen-separated input, and
/// keeps runs of uppercase letters together (`HTTPServer` → `http_server`).
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' || c == '-' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_ascii_uppercase() {
            let prev_is_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if (prev_is_lower || next_is_lower) && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out.trim_matches('_').to_string()
}

/// Convert a name to an exported Go identifier (`PascalCase`).
///
/// Initialism segments are kept fully uppercase, following Go convention:
/// `user_id` → `UserID`, `api_key` → `APIKey`.
pub fn pascal_case(name: &str) -> String {
    snake_case(name)
        .split('_')
        .filter(|seg| !seg.is_empty())
        .map(upper_segment)
        .collect()
}

/// Convert a name to an unexported Go identifier (`lowerCamel`).
pub fn lower_camel(name: &str) -> String {
    let snake = snake_case(name);
    let mut segments = snake.split('_').filter(|seg| !seg.is_empty());
    let mut out = String::with_capacity(snake.len());
    if let Some(first) = segments.next() {
        out.push_str(first);
    }
    for seg in segments {
        out.push_str(&upper_segment(seg));
    }
    out
}

fn upper_segment(seg: &str) -> String {
    if INITIALISMS.contains(&seg) {
        return seg.to_ascii_uppercase();
    }
    let mut chars = seg.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Derive the plural form of a (snake_case) word.
///
/// Regular English rules with the `-es` and `-ies` exceptions, plus a small
/// irregular table. Only the final underscore-separated segment is inflected,
/// so `order_line` pluralizes to `order_lines`.
pub fn pluralize(word: &str) -> String {
    let snake = snake_case(word);
    let (stem, last) = match snake.rfind('_') {
        Some(idx) => (&snake[..=idx], &snake[idx + 1..]),
        None => ("", snake.as_str()),
    };
    let plural_last = pluralize_segment(last);
    format!("{stem}{plural_last}")
}

fn pluralize_segment(word: &str) -> String {
    if let Some((_, irregular)) = IRREGULAR_PLURALS.iter().find(|(s, _)| *s == word) {
        return (*irregular).to_string();
    }
    let bytes = word.as_bytes();
    if word.ends_with('s') || word.ends_with('x') || word.ends_with('z')
        || word.ends_with("ch") || word.ends_with("sh")
    {
        return format!("{word}es");
    }
    if word.ends_with('y') && bytes.len() >= 2 && !is_vowel(bytes[bytes.len() - 2]) {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    format!("{word}s")
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}

/// Physical table (or collection) name for a model: plural snake_case.
pub fn table_name(model: &str) -> String {
    pluralize(&snake_case(model))
}

/// Sanitize a display name into an identifier usable in paths and module
/// names: lowercased, spaces and hyphens mapped to underscores, everything
/// outside `[a-z0-9_]` dropped.
pub fn sanitize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// The Go type emitted for a specification field type.
pub fn go_type(ty: FieldType) -> &'static str {
    match ty {
        FieldType::Text | FieldType::String | FieldType::Email | FieldType::Uuid => "string",
        FieldType::Bool => "bool",
        FieldType::Int => "int64",
        FieldType::Decimal => "float64",
        FieldType::Datetime => "time.Time",
        FieldType::Json => "json.RawMessage",
    }
}
