//! Text rendering for human-friendly error messages.
//!
//! Full Rust type paths are too noisy for diagnostics; these helpers
//! strip module prefixes and rank "did you mean?" candidates.

/// Shortens a fully qualified type name for display.
///
/// # Examples
/// ```
/// use wasl_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut start = 0;

    for (i, ch) in full_name.char_indices() {
        if matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']') {
            out.push_str(last_path_segment(&full_name[start..i]));
            out.push(ch);
            start = i + ch.len_utf8();
        }
    }

    out.push_str(last_path_segment(&full_name[start..]));
    out
}

fn last_path_segment(segment: &str) -> &str {
    segment.rsplit("::").next().unwrap_or(segment)
}

/// Ranks registered type names against a requested one and returns the
/// closest matches, best first.
///
/// Used for "did you mean?" hints when a lookup fails. The ranking is a
/// cheap heuristic: exact short-name match beats substring containment,
/// which beats a shared prefix of at least three characters.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_ascii_lowercase();

    let mut ranked: Vec<(u8, &str)> = available
        .iter()
        .filter_map(|&candidate| {
            let short = shorten_type_name(candidate).to_ascii_lowercase();

            let score = if short == wanted {
                3
            } else if short.contains(&wanted) || wanted.contains(&short) {
                2
            } else if shared_prefix_len(&short, &wanted) >= 3 {
                1
            } else {
                return None;
            };

            Some((score, candidate))
        })
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    ranked
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.to_string())
        .collect()
}

fn shared_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(ca, cb)| ca == cb)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_simple_path() {
        assert_eq!(
            shorten_type_name("my_app::services::UserService"),
            "UserService"
        );
    }

    #[test]
    fn shorten_with_generics() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>"),
            "Arc<dyn Logger>"
        );
    }

    #[test]
    fn shorten_nested_generics() {
        assert_eq!(
            shorten_type_name("std::collections::HashMap<alloc::string::String, core::option::Option<u32>>"),
            "HashMap<String, Option<u32>>"
        );
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_type_name("String"), "String");
    }

    #[test]
    fn suggest_close_match() {
        let available = vec![
            "my_app::UserService",
            "my_app::UserRepository",
            "my_app::Logger",
            "my_app::Database",
        ];

        let suggestions = suggest_similar("UserServ", &available, 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].contains("UserService"));
    }

    #[test]
    fn suggest_exact_short_name_first() {
        let available = vec!["a::Database", "b::DatabasePool"];
        let suggestions = suggest_similar("other::Database", &available, 3);
        assert_eq!(suggestions[0], "a::Database");
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["my_app::Database"];
        let suggestions = suggest_similar("XyzQwerty", &available, 3);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn suggest_respects_limit() {
        let available = vec!["a::Config", "b::Config", "c::Config"];
        let suggestions = suggest_similar("Config", &available, 2);
        assert_eq!(suggestions.len(), 2);
    }
}
