//! Environment-variable expansion applied to configuration files before parsing.
//!
//! Follows shell-style rules:
//! - `$NAME` where `NAME` is `[A-Za-z0-9_]+`, and `${NAME}` where `NAME` is
//!   anything up to the closing `}`;
//! - the special names `*#$@!?-` and a single digit: `$$` looks up `$`,
//!   `$1x` looks up `1` followed by `x`;
//! - unset variables expand to an empty string;
//! - `${}` and an unterminated `${` are removed, braces included;
//! - a `$` at the end of input, or followed by any other character, is kept.

/// Expands variables from the process environment.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expands variables using `lookup`.
///
/// ```rust
/// use resvisor::config::expand_with;
///
/// let out = expand_with("http://$HOST:${PORT}/$MISSING", |name| match name {
///     "HOST" => Some("db".to_string()),
///     "PORT" => Some("5432".to_string()),
///     _ => None,
/// });
/// assert_eq!(out, "http://db:5432/");
/// ```
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if after.is_empty() {
            out.push('$');
            rest = after;
            break;
        }

        let (name, width) = variable_name(after);
        match name {
            Some(name) => out.push_str(&lookup(name).unwrap_or_default()),
            None if width == 0 => out.push('$'),
            None => {}
        }
        rest = &after[width..];
    }

    out.push_str(rest);
    out
}

/// Splits the variable reference at the start of `s` (just past a `$`).
///
/// Returns the name, if any, and how many bytes the reference spans. A
/// missing name with a nonzero width is malformed syntax to be dropped.
fn variable_name(s: &str) -> (Option<&str>, usize) {
    let bytes = s.as_bytes();
    if bytes[0] == b'{' {
        if bytes.len() > 2 && is_special(bytes[1]) && bytes[2] == b'}' {
            return (Some(&s[1..2]), 3);
        }
        return match s[1..].find('}') {
            Some(0) => (None, 2),
            Some(end) => (Some(&s[1..=end]), end + 2),
            None => (None, 1),
        };
    }
    if is_special(bytes[0]) {
        return (Some(&s[..1]), 1);
    }

    let len = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    if len == 0 { (None, 0) } else { (Some(&s[..len]), len) }
}

fn is_special(b: u8) -> bool {
    matches!(b, b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-') || b.is_ascii_digit()
}
