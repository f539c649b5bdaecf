//! Declarative command line option processing.
//!
//! Options are declared with builders and register themselves into a
//! process-global registry; a single entry point walks argv, matches
//! tokens against the registered set, and dispatches values through
//! per-type parsers into each option's storage.
//!
//! ```no_run
//! use declopt::{Opt, OptList, ParseSettings};
//!
//! let count = Opt::<u32>::build("count")
//!     .desc("how many times to run")
//!     .init(1)
//!     .register();
//! let inputs = OptList::<String>::positional("input")
//!     .one_or_more()
//!     .register();
//!
//! declopt::parse_command_line_options(
//!     &ParseSettings::new("runner").overview("Runs inputs repeatedly."),
//! );
//!
//! println!("{} inputs, {} times", inputs.values().len(), count.value());
//! ```
//!
//! Subcommands scope their own option sets (`SubCommand::new`), `-help`
//! and `-version` are registered automatically, and
//! `reset_all_option_occurrences` / `reset_command_line_parser` rewind
//! the world for repeated parses and tests.

mod engine;
mod entry;
mod error;
mod interface;
mod model;
mod option;
mod printer;
mod registry;
mod value;

pub use entry::{
    parse_command_line_options, print_help_message, print_version_message,
    try_parse_command_line_options, ParseSettings,
};
pub use error::{ConfigError, ParseError};
pub use interface::{ConsoleInterface, UserInterface};
pub use model::{BoolOrDefault, Formatting, Hidden, Misc, Occurrences, ValueExpected};
pub use option::{
    Alias, AliasBuilder, BitIndexed, BitsBuilder, ListBuilder, ListValue, Location, Opt, OptBits,
    OptBuilder, OptList, OptionRef, ScalarValue,
};
pub use registry::{
    add_extra_help, add_extra_version_printer, hide_unrelated_options, registered_option_names,
    registered_sub_commands, reset_all_option_occurrences, reset_command_line_parser,
    set_version_printer, Category, SubCommand, VersionPrinter,
};
pub use value::{
    BoolParser, CharParser, FromArgv, FromStrParser, LiteralParser, StringParser, TristateParser,
    ValueParser,
};

#[doc(hidden)]
pub use option::OptionHandle;

#[cfg(test)]
pub(crate) mod test {
    macro_rules! assert_contains {
        ($base:expr, $sub:expr) => {
            assert!(
                $base.contains($sub),
                "'{b}' does not contain '{s}'",
                b = $base,
                s = $sub,
            );
        };
    }

    pub(crate) use assert_contains;
}
