//! Per-type value parsers.
//!
//! The engine never interprets raw values itself; each option carries a
//! `ValueParser` that converts the matched text and advertises how much of
//! a value the option expects by default.

use std::marker::PhantomData;
use std::str::FromStr;

use crate::model::{BoolOrDefault, ValueExpected};

/// Converts raw argv text into a typed value.
pub trait ValueParser<T>: Send + Sync {
    /// Parse `raw` for the option named `option_name`, matched on the
    /// command line as `matched_name`. Returns the message of a
    /// `ParseFailure` diagnostic on rejection.
    fn parse(&self, option_name: &str, matched_name: &str, raw: &str) -> Result<T, String>;

    /// The value expectation used when the option declares none.
    fn default_value_expected(&self, has_name: bool) -> ValueExpected {
        let _ = has_name;
        ValueExpected::Required
    }

    /// Placeholder shown in help output, e.g. `int` in `-n=<int>`.
    /// `None` suppresses the `=<...>` suffix entirely.
    fn value_name(&self) -> Option<String> {
        Some("value".to_string())
    }

    /// Names this parser contributes to the option's naming surface
    /// (non-empty only for mapping parsers on un-named options).
    fn literal_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// `(literal, description)` pairs for help output.
    fn literal_help(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Lookahead probe: would `parse` accept this text as a value?
    fn accepts(&self, raw: &str) -> bool;
}

/// Boolean parser: accepts the empty string (bare flag) as `true`.
#[derive(Default)]
pub struct BoolParser;

fn parse_bool_token(raw: &str) -> Option<bool> {
    if raw.is_empty() {
        return Some(true);
    }
    for truthy in ["true", "1", "yes"] {
        if raw.eq_ignore_ascii_case(truthy) {
            return Some(true);
        }
    }
    for falsy in ["false", "0", "no"] {
        if raw.eq_ignore_ascii_case(falsy) {
            return Some(false);
        }
    }
    None
}

impl ValueParser<bool> for BoolParser {
    fn parse(&self, _option_name: &str, _matched_name: &str, raw: &str) -> Result<bool, String> {
        parse_bool_token(raw)
            .ok_or_else(|| format!("'{raw}' is invalid for a boolean argument; use 0 or 1"))
    }

    fn default_value_expected(&self, _has_name: bool) -> ValueExpected {
        ValueExpected::Optional
    }

    fn value_name(&self) -> Option<String> {
        None
    }

    fn accepts(&self, raw: &str) -> bool {
        parse_bool_token(raw).is_some()
    }
}

/// Tri-state boolean parser; a bare flag yields `True`.
#[derive(Default)]
pub struct TristateParser;

impl ValueParser<BoolOrDefault> for TristateParser {
    fn parse(
        &self,
        _option_name: &str,
        _matched_name: &str,
        raw: &str,
    ) -> Result<BoolOrDefault, String> {
        match parse_bool_token(raw) {
            Some(true) => Ok(BoolOrDefault::True),
            Some(false) => Ok(BoolOrDefault::False),
            None => Err(format!(
                "'{raw}' is invalid for a boolean argument; use 0 or 1"
            )),
        }
    }

    fn default_value_expected(&self, _has_name: bool) -> ValueExpected {
        ValueExpected::Optional
    }

    fn value_name(&self) -> Option<String> {
        None
    }

    fn accepts(&self, raw: &str) -> bool {
        parse_bool_token(raw).is_some()
    }
}

/// Parser for any `FromStr` type, labelled for help output.
pub struct FromStrParser<T> {
    value_name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> FromStrParser<T> {
    pub fn new(value_name: &'static str) -> Self {
        Self {
            value_name,
            _phantom: PhantomData,
        }
    }
}

impl<T: FromStr> ValueParser<T> for FromStrParser<T> {
    fn parse(&self, _option_name: &str, _matched_name: &str, raw: &str) -> Result<T, String> {
        T::from_str(raw).map_err(|_| {
            format!(
                "'{raw}' value invalid for {name} argument",
                name = self.value_name
            )
        })
    }

    fn value_name(&self) -> Option<String> {
        Some(self.value_name.to_string())
    }

    fn accepts(&self, raw: &str) -> bool {
        T::from_str(raw).is_ok()
    }
}

/// Identity parser for strings.
#[derive(Default)]
pub struct StringParser;

impl ValueParser<String> for StringParser {
    fn parse(&self, _option_name: &str, _matched_name: &str, raw: &str) -> Result<String, String> {
        Ok(raw.to_string())
    }

    fn value_name(&self) -> Option<String> {
        Some("string".to_string())
    }

    fn accepts(&self, _raw: &str) -> bool {
        true
    }
}

/// Takes the first character of the raw value.
#[derive(Default)]
pub struct CharParser;

impl ValueParser<char> for CharParser {
    fn parse(&self, _option_name: &str, _matched_name: &str, raw: &str) -> Result<char, String> {
        raw.chars()
            .next()
            .ok_or_else(|| "empty value for char argument".to_string())
    }

    fn value_name(&self) -> Option<String> {
        Some("char".to_string())
    }

    fn accepts(&self, raw: &str) -> bool {
        !raw.is_empty()
    }
}

struct Literal<T> {
    name: String,
    value: T,
    help: String,
}

/// Mapping-table parser: matches a closed set of literal spellings.
///
/// On an option with a name the literal is the value (`-opt=fast`); on an
/// un-named option the literals themselves become the option's naming
/// surface (`-fast`).
pub struct LiteralParser<T> {
    values: Vec<Literal<T>>,
}

impl<T> Default for LiteralParser<T> {
    fn default() -> Self {
        Self {
            values: Vec::default(),
        }
    }
}

impl<T> LiteralParser<T> {
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: T,
        help: impl Into<String>,
    ) -> Result<(), String> {
        let name = name.into();
        if self.values.iter().any(|literal| literal.name == name) {
            return Err(name);
        }
        self.values.push(Literal {
            name,
            value,
            help: help.into(),
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Clone + Send + Sync> ValueParser<T> for LiteralParser<T> {
    fn parse(&self, option_name: &str, matched_name: &str, raw: &str) -> Result<T, String> {
        // Named options carry the literal in the value; un-named options
        // were matched by the literal itself.
        let key = if option_name.is_empty() {
            matched_name
        } else {
            raw
        };
        self.values
            .iter()
            .find(|literal| literal.name == key)
            .map(|literal| literal.value.clone())
            .ok_or_else(|| format!("cannot find option named '{key}'"))
    }

    fn default_value_expected(&self, has_name: bool) -> ValueExpected {
        if has_name {
            ValueExpected::Required
        } else {
            ValueExpected::Disallowed
        }
    }

    fn value_name(&self) -> Option<String> {
        None
    }

    fn literal_names(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|literal| literal.name.clone())
            .collect()
    }

    fn literal_help(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|literal| (literal.name.clone(), literal.help.clone()))
            .collect()
    }

    fn accepts(&self, raw: &str) -> bool {
        self.values.iter().any(|literal| literal.name == raw)
    }
}

/// Selects the default parser for a storage type.
pub trait FromArgv: Sized + 'static {
    fn default_parser() -> Box<dyn ValueParser<Self>>;
}

impl FromArgv for bool {
    fn default_parser() -> Box<dyn ValueParser<Self>> {
        Box::new(BoolParser)
    }
}

impl FromArgv for BoolOrDefault {
    fn default_parser() -> Box<dyn ValueParser<Self>> {
        Box::new(TristateParser)
    }
}

impl FromArgv for String {
    fn default_parser() -> Box<dyn ValueParser<Self>> {
        Box::new(StringParser)
    }
}

impl FromArgv for char {
    fn default_parser() -> Box<dyn ValueParser<Self>> {
        Box::new(CharParser)
    }
}

macro_rules! from_argv_via_from_str {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromArgv for $ty {
                fn default_parser() -> Box<dyn ValueParser<Self>> {
                    Box::new(FromStrParser::new($name))
                }
            }
        )*
    };
}

from_argv_via_from_str! {
    i32 => "int",
    i64 => "long",
    isize => "int",
    u32 => "uint",
    u64 => "ulong",
    usize => "uint",
    f32 => "number",
    f64 => "number",
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", Some(true))]
    #[case("true", Some(true))]
    #[case("TRUE", Some(true))]
    #[case("True", Some(true))]
    #[case("1", Some(true))]
    #[case("yes", Some(true))]
    #[case("YES", Some(true))]
    #[case("false", Some(false))]
    #[case("FALSE", Some(false))]
    #[case("0", Some(false))]
    #[case("no", Some(false))]
    #[case("2", None)]
    #[case("maybe", None)]
    #[case("truee", None)]
    fn bool_tokens(#[case] raw: &str, #[case] expected: Option<bool>) {
        let parser = BoolParser;
        match expected {
            Some(value) => {
                assert_eq!(parser.parse("v", "v", raw).unwrap(), value);
                assert!(parser.accepts(raw));
            }
            None => {
                assert!(parser.parse("v", "v", raw).is_err());
                assert!(!parser.accepts(raw));
            }
        }
    }

    #[rstest]
    #[case("", BoolOrDefault::True)]
    #[case("yes", BoolOrDefault::True)]
    #[case("no", BoolOrDefault::False)]
    fn tristate_tokens(#[case] raw: &str, #[case] expected: BoolOrDefault) {
        assert_eq!(TristateParser.parse("v", "v", raw).unwrap(), expected);
    }

    #[test]
    fn tristate_rejects() {
        assert!(TristateParser.parse("v", "v", "perhaps").is_err());
    }

    #[rstest]
    #[case("0", 0)]
    #[case("7", 7)]
    #[case("-3", -3)]
    fn int_tokens(#[case] raw: &str, #[case] expected: i64) {
        let parser = FromStrParser::<i64>::new("long");
        assert_eq!(parser.parse("n", "n", raw).unwrap(), expected);
    }

    #[test]
    fn int_rejects() {
        let parser = FromStrParser::<i64>::new("long");
        let message = parser.parse("n", "n", "seven").unwrap_err();
        assert_eq!(message, "'seven' value invalid for long argument");
        assert!(!parser.accepts("seven"));
    }

    #[test]
    fn string_identity() {
        assert_eq!(
            StringParser.parse("s", "s", " spaced ").unwrap(),
            " spaced "
        );
        assert!(StringParser.accepts(""));
    }

    #[test]
    fn char_first() {
        assert_eq!(CharParser.parse("c", "c", "abc").unwrap(), 'a');
        assert!(CharParser.parse("c", "c", "").is_err());
    }

    #[test]
    fn literal_named_owner() {
        let mut parser = LiteralParser::default();
        parser.insert("fast", 1u32, "run fast").unwrap();
        parser.insert("slow", 2u32, "run slow").unwrap();

        // Named owner: the raw value carries the literal.
        assert_eq!(parser.parse("speed", "speed", "fast").unwrap(), 1);
        assert!(parser.parse("speed", "speed", "medium").is_err());
        assert_eq!(
            parser.default_value_expected(true),
            ValueExpected::Required
        );
    }

    #[test]
    fn literal_unnamed_owner() {
        let mut parser = LiteralParser::default();
        parser.insert("fast", 1u32, "run fast").unwrap();

        // Un-named owner: the matched name carries the literal.
        assert_eq!(parser.parse("", "fast", "").unwrap(), 1);
        assert_eq!(parser.literal_names(), vec!["fast".to_string()]);
        assert_eq!(
            parser.default_value_expected(false),
            ValueExpected::Disallowed
        );
    }

    #[test]
    fn literal_duplicate() {
        let mut parser = LiteralParser::default();
        parser.insert("fast", 1u32, "").unwrap();
        assert_eq!(parser.insert("fast", 2u32, "").unwrap_err(), "fast");
    }
}
