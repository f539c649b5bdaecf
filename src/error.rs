//! Error types for registration and parsing.

use thiserror::Error;

/// A programmer mistake caught while registering an option.
///
/// These are fatal: `register()` panics with the message, while
/// `try_register()` surfaces them for tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("option '{0}' registered more than once")]
    DuplicateOption(String),

    #[error("grouping applies only to single character options, not '{0}'")]
    GroupingName(String),

    #[error("positional options must not carry a name ('{0}')")]
    NamedPositional(String),

    #[error("sink options must not carry a name ('{0}')")]
    NamedSink(String),

    #[error("an un-named option must be positional, a sink, trailing, or literal-mapped")]
    UnnamedOption,

    #[error("subcommand already has an option consuming trailing arguments")]
    SecondConsumeAfter,

    #[error("external location bound more than once for '{0}'")]
    SecondLocation(String),

    #[error("alias '{0}' must name a target option")]
    AliasWithoutTarget(String),

    #[error("alias '{0}' must not restrict subcommands; the target's apply")]
    AliasWithSub(String),

    #[error("alias must have a name")]
    UnnamedAlias,

    #[error("a positional eating arguments must allow repeated values")]
    EatsArgsCardinality,

    #[error("literal '{0}' registered more than once")]
    DuplicateLiteral(String),

    #[error("option '{0}' was not the most recently registered in its subcommand")]
    UnregisterOrder(String),
}

/// A failure reported while walking argv.
///
/// Option-scoped variants render as `<name>: <message>` per the
/// diagnostic convention.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("unknown command line argument '{0}'")]
    UnknownOption(String),

    #[error("{name}: requires a value, but none was supplied")]
    MissingValue { name: String },

    #[error("{name}: does not allow a value ('{value}' supplied)")]
    UnexpectedValue { name: String, value: String },

    #[error("{name}: may only occur zero or one times")]
    DuplicateOccurrence { name: String },

    #[error("{name}: {message}")]
    ParseFailure { name: String, message: String },

    #[error("{name}: must be specified at least once")]
    MissingRequired { name: String },

    #[error("{name}: this positional argument was not provided")]
    MissingPositional { name: String },

    #[error("too many positional arguments seen ('{0}' unclaimed)")]
    ExcessPositional(String),

    #[error("an option consuming trailing arguments requires at least one required positional")]
    ConsumeAfterWithoutPositional,

    #[error("{name}: cannot be the head of a group; it requires a value")]
    GroupedValueHead { name: String },

    #[error("unknown subcommand '{0}'")]
    UnknownSubCommand(String),
}

impl ParseError {
    /// The option name a diagnostic is scoped to, when there is one.
    pub fn option_name(&self) -> Option<&str> {
        match self {
            ParseError::MissingValue { name }
            | ParseError::UnexpectedValue { name, .. }
            | ParseError::DuplicateOccurrence { name }
            | ParseError::ParseFailure { name, .. }
            | ParseError::MissingRequired { name }
            | ParseError::MissingPositional { name }
            | ParseError::GroupedValueHead { name } => Some(name),
            _ => None,
        }
    }
}
