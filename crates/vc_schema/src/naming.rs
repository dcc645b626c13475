use alloc::string::String;
use alloc::vec::Vec;

// -----------------------------------------------------------------------------
// NamingStrategy

/// Transform from internal property names to external names.
///
/// Only applied to properties without an explicit external name. Words are
/// split on `_`, `-`, `.` and on lower-to-upper case transitions, so both
/// `first_name` and `firstName` are understood.
///
/// # Examples
///
/// ```
/// use vc_schema::NamingStrategy;
///
/// assert_eq!(NamingStrategy::SnakeCase.apply("firstName"), "first_name");
/// assert_eq!(NamingStrategy::UpperCamelCase.apply("first_name"), "FirstName");
/// assert_eq!(NamingStrategy::KebabCase.apply("lastLoginAt"), "last-login-at");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingStrategy {
    /// `firstName`
    LowerCamelCase,
    /// `FirstName`
    UpperCamelCase,
    /// `first_name`
    SnakeCase,
    /// `FIRST_NAME`
    UpperSnakeCase,
    /// `first-name`
    KebabCase,
    /// `firstname`
    LowerCase,
    /// `first.name`
    LowerDotCase,
}

impl NamingStrategy {
    /// Converts `name` to this strategy.
    pub fn apply(self, name: &str) -> String {
        let words = split_words(name);

        match self {
            NamingStrategy::LowerCamelCase => {
                let mut out = String::with_capacity(name.len());
                for (index, word) in words.iter().enumerate() {
                    if index == 0 {
                        out.push_str(&word.to_lowercase());
                    } else {
                        push_capitalized(&mut out, word);
                    }
                }
                out
            }
            NamingStrategy::UpperCamelCase => {
                let mut out = String::with_capacity(name.len());
                words.iter().for_each(|word| push_capitalized(&mut out, word));
                out
            }
            NamingStrategy::SnakeCase => join_lower(&words, "_"),
            NamingStrategy::UpperSnakeCase => join_lower(&words, "_").to_uppercase(),
            NamingStrategy::KebabCase => join_lower(&words, "-"),
            NamingStrategy::LowerCase => join_lower(&words, ""),
            NamingStrategy::LowerDotCase => join_lower(&words, "."),
        }
    }
}

fn split_words(name: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (index, ch) in name.char_indices() {
        if matches!(ch, '_' | '-' | '.' | ' ') {
            if start < index {
                words.push(&name[start..index]);
            }
            start = index + ch.len_utf8();
            prev = None;
            continue;
        }
        if ch.is_uppercase()
            && let Some(p) = prev
            && (p.is_lowercase() || p.is_ascii_digit())
            && start < index
        {
            words.push(&name[start..index]);
            start = index;
        }
        prev = Some(ch);
    }
    if start < name.len() {
        words.push(&name[start..]);
    }
    words
}

fn push_capitalized(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(&chars.as_str().to_lowercase());
    }
}

fn join_lower(words: &[&str], sep: &str) -> String {
    let mut out = String::new();
    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            out.push_str(sep);
        }
        out.push_str(&word.to_lowercase());
    }
    out
}

// -----------------------------------------------------------------------------
// Tests
