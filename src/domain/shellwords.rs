//! Quote-aware command-line tokenizer.
//!
//! Splits a configured command template into argv tokens before template
//! substitution happens, so substituted values stay inside their argument
//! boundary no matter what they contain. Supports POSIX-style single
//! quotes (literal), double quotes (backslash escapes `\"` and `\\`) and
//! unquoted backslash escapes.

use thiserror::Error;

/// Tokenization failure.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ShellSplitError {
    #[error("unterminated quote in command line")]
    UnterminatedQuote,

    #[error("trailing backslash in command line")]
    TrailingBackslash,
}

/// Split `input` into argv tokens.
pub fn split(input: &str) -> Result<Vec<String>, ShellSplitError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '\'' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(ShellSplitError::UnterminatedQuote),
                    }
                }
            }
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(ShellSplitError::UnterminatedQuote),
                        },
                        Some(c) => current.push(c),
                        None => return Err(ShellSplitError::UnterminatedQuote),
                    }
                }
            }
            '\\' => {
                in_token = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(ShellSplitError::TrailingBackslash),
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn splits_plain_words() {
        assert_eq!(split("echo hello world").unwrap(), ["echo", "hello", "world"]);
        assert_eq!(split("  spaced   out  ").unwrap(), ["spaced", "out"]);
        assert_eq!(split("").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn single_quotes_are_literal() {
        assert_eq!(split(r#"echo 'a b' 'c "d"'"#).unwrap(), ["echo", "a b", r#"c "d""#]);
    }

    #[test]
    fn double_quotes_allow_escapes() {
        assert_eq!(split(r#"echo "a \"b\" c""#).unwrap(), ["echo", r#"a "b" c"#]);
        assert_eq!(split(r#"echo "back\\slash""#).unwrap(), ["echo", r"back\slash"]);
    }

    #[test]
    fn adjacent_quoted_parts_join() {
        assert_eq!(split(r#"a'b c'"d e""#).unwrap(), ["ab cd e"]);
    }

    #[test]
    fn empty_quoted_token_survives() {
        assert_eq!(split(r#"echo """#).unwrap(), ["echo", ""]);
    }

    #[test]
    fn template_markers_stay_inside_tokens() {
        assert_eq!(
            split(r#"notify-send "{{user.name}}" {{var.city}}"#).unwrap(),
            ["notify-send", "{{user.name}}", "{{var.city}}"]
        );
    }

    #[test]
    fn unterminated_quote_errors() {
        assert_eq!(split("echo 'oops"), Err(ShellSplitError::UnterminatedQuote));
        assert_eq!(split(r#"echo "oops"#), Err(ShellSplitError::UnterminatedQuote));
    }

    #[test]
    fn trailing_backslash_errors() {
        assert_eq!(split(r"echo oops\"), Err(ShellSplitError::TrailingBackslash));
    }

    proptest! {
        // Any token set survives a quote-wrap round trip: wrapping each
        // token in single quotes (with embedded quotes escaped) and
        // re-splitting yields the original tokens.
        #[test]
        fn quoted_round_trip(tokens in proptest::collection::vec(".*", 0..8)) {
            let line = tokens
                .iter()
                .map(|t| format!("'{}'", t.replace('\'', r#"'\''"#)))
                .collect::<Vec<_>>()
                .join(" ");
            let reparsed = split(&line).unwrap();
            prop_assert_eq!(reparsed, tokens);
        }
    }
}
