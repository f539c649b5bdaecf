//! Splits argv into a forward stream of classified tokens.
//!
//! The categorizer only looks at dashes and `=` delimiters; deciding
//! whether a single-dash token is a long option, a short option, or a
//! group of shorts is the resolver's job.

/// The option-shaped part of a token.
///
/// `body` is everything after the dashes, unsplit; `name`/`value` are the
/// `=`-delimited halves. Prefix matching works on `body`, exact matching
/// on `name`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct OptText<'a> {
    pub body: &'a str,
    pub name: &'a str,
    pub value: Option<&'a str>,
}

fn split_equals(body: &str) -> OptText<'_> {
    match body.split_once('=') {
        Some((name, value)) => OptText {
            body,
            name,
            value: Some(value),
        },
        None => OptText {
            body,
            name: body,
            value: None,
        },
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TokenKind<'a> {
    /// `--name` or `--name=value`: always a long option.
    Long(OptText<'a>),
    /// `-x...`: long, short, grouped, or prefixed; the resolver decides.
    Dash(OptText<'a>),
    /// Anything else, including a lone `-` (stdin convention).
    Bareword(&'a str),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Index into the token slice handed to the parse.
    pub index: usize,
    /// The original argv entry, verbatim.
    pub text: &'a str,
}

pub(crate) struct Categorizer<'a> {
    tokens: &'a [&'a str],
    cursor: usize,
    raw_only: bool,
}

impl<'a> Categorizer<'a> {
    pub(crate) fn new(tokens: &'a [&'a str]) -> Self {
        Self {
            tokens,
            cursor: 0,
            raw_only: false,
        }
    }

    /// The next classified token, or `None` at end of input. A lone `--`
    /// flips the remainder of argv into raw bareword mode.
    pub(crate) fn next(&mut self) -> Option<Token<'a>> {
        loop {
            let text = *self.tokens.get(self.cursor)?;
            let index = self.cursor;
            self.cursor += 1;

            if self.raw_only {
                return Some(Token {
                    kind: TokenKind::Bareword(text),
                    index,
                    text,
                });
            }

            if text == "--" {
                self.raw_only = true;
                continue;
            }

            let kind = if let Some(body) = text.strip_prefix("--") {
                TokenKind::Long(split_equals(body))
            } else if text.len() > 1 && text.starts_with('-') {
                TokenKind::Dash(split_equals(&text[1..]))
            } else {
                TokenKind::Bareword(text)
            };

            return Some(Token { kind, index, text });
        }
    }

    /// Consume the next argv entry verbatim as an option value, whatever
    /// it looks like.
    pub(crate) fn take_value(&mut self) -> Option<(usize, &'a str)> {
        let value = *self.tokens.get(self.cursor)?;
        let index = self.cursor;
        self.cursor += 1;
        Some((index, value))
    }

    /// Look at the next argv entry without consuming it.
    pub(crate) fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.cursor).copied()
    }

    /// Whether `--` has switched the remainder into raw bareword mode.
    pub(crate) fn raw_only(&self) -> bool {
        self.raw_only
    }
}
