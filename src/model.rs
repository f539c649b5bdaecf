//! Core descriptor vocabulary shared by every option kind.

/// How many occurrences of an option are permitted during one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occurrences {
    /// Zero or one occurrence.
    #[default]
    Optional,
    /// Any number of occurrences, including none.
    ZeroOrMore,
    /// Exactly one occurrence.
    Required,
    /// At least one occurrence.
    OneOrMore,
    /// Receives every token that follows the last required positional,
    /// verbatim. At most one such option may exist per subcommand.
    ConsumeAfter,
}

impl Occurrences {
    /// Minimum number of occurrences this flag demands.
    pub(crate) fn minimum(&self) -> u32 {
        match self {
            Occurrences::Required | Occurrences::OneOrMore => 1,
            _ => 0,
        }
    }

    /// Whether a second (non multi-value) occurrence is an error.
    pub(crate) fn single(&self) -> bool {
        matches!(self, Occurrences::Optional | Occurrences::Required)
    }
}

/// Whether an option takes an accompanying value.
///
/// `Unspecified` defers to the option's value parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueExpected {
    #[default]
    Unspecified,
    /// The value may appear, or not.
    Optional,
    /// The value must appear.
    Required,
    /// A value may not be specified.
    Disallowed,
}

/// Visibility of an option in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Hidden {
    /// Shown by `-help` and `-help-hidden`.
    #[default]
    Visible,
    /// Shown only by `-help-hidden`.
    Hidden,
    /// Never shown.
    ReallyHidden,
}

/// How the option's name participates in token matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Formatting {
    #[default]
    Normal,
    /// Matched by argv ordinal instead of by name; the name is empty.
    Positional,
    /// The option name may directly prefix its value (`-Lfoo`).
    Prefix,
    /// Like `Prefix`, but the `name=value` form is rejected.
    AlwaysPrefix,
}

/// Miscellaneous matching behaviors an option can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Misc {
    /// Split each raw value at commas and dispatch per piece.
    pub comma_separated: bool,
    /// A positional that swallows option-like tokens once it has begun.
    pub positional_eats_args: bool,
    /// Receives any token no other resolution claims.
    pub sink: bool,
    /// Single-char option that may bunch under one dash (`-lah`).
    pub grouping: bool,
    /// Exempt from the one-occurrence limit; later occurrences override.
    pub default_option: bool,
}

/// Tri-state boolean for options that distinguish "never specified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolOrDefault {
    #[default]
    Unset,
    True,
    False,
}

impl std::fmt::Display for BoolOrDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoolOrDefault::Unset => write!(f, "unset"),
            BoolOrDefault::True => write!(f, "true"),
            BoolOrDefault::False => write!(f, "false"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Occurrences::Optional, 0, true)]
    #[case(Occurrences::ZeroOrMore, 0, false)]
    #[case(Occurrences::Required, 1, true)]
    #[case(Occurrences::OneOrMore, 1, false)]
    #[case(Occurrences::ConsumeAfter, 0, false)]
    fn occurrence_bounds(
        #[case] occurrences: Occurrences,
        #[case] minimum: u32,
        #[case] single: bool,
    ) {
        assert_eq!(occurrences.minimum(), minimum);
        assert_eq!(occurrences.single(), single);
    }

    #[test]
    fn defaults() {
        assert_eq!(Occurrences::default(), Occurrences::Optional);
        assert_eq!(ValueExpected::default(), ValueExpected::Unspecified);
        assert_eq!(Hidden::default(), Hidden::Visible);
        assert_eq!(Formatting::default(), Formatting::Normal);
        assert_eq!(BoolOrDefault::default(), BoolOrDefault::Unset);
        assert!(!Misc::default().sink);
    }
}
