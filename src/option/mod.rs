//! Option records: the erased handle the engine dispatches through, the
//! descriptor it matches against, and the builder plumbing shared by every
//! option kind.

mod alias;
mod bits;
mod list;
mod scalar;

pub use alias::{Alias, AliasBuilder};
pub use bits::{BitIndexed, BitsBuilder, OptBits};
pub use list::{ListBuilder, ListValue, OptList};
pub use scalar::{Opt, OptBuilder, ScalarValue};

pub(crate) use alias::builtin_alias;
pub(crate) use scalar::builtin_flag;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ConfigError, ParseError};
use crate::model::{Formatting, Hidden, Misc, Occurrences, ValueExpected};
use crate::registry::{Category, SubCommand};

/// Built-in actions surfaced to the entry point instead of storing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Help { hidden: bool, list: bool },
    Version,
    PrintOptions { all: bool },
}

/// Everything the engine needs to know about an option besides its storage.
pub struct Descriptor {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) value_desc: Option<String>,
    pub(crate) occurrences: Occurrences,
    pub(crate) value_expected: ValueExpected,
    hidden: AtomicU8,
    pub(crate) formatting: Formatting,
    pub(crate) misc: Misc,
    pub(crate) additional_values: u32,
    pub(crate) categories: Vec<Category>,
    pub(crate) subs: Vec<SubCommand>,
    pub(crate) builtin: Option<Builtin>,
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .finish()
    }
}

impl Descriptor {
    pub(crate) fn hidden(&self) -> Hidden {
        match self.hidden.load(Ordering::Relaxed) {
            0 => Hidden::Visible,
            1 => Hidden::Hidden,
            _ => Hidden::ReallyHidden,
        }
    }

    pub(crate) fn set_hidden(&self, hidden: Hidden) {
        self.hidden.store(hidden as u8, Ordering::Relaxed);
    }

    pub(crate) fn is_positional(&self) -> bool {
        self.formatting == Formatting::Positional
    }

    /// The name a diagnostic should carry: the argument name, or the value
    /// placeholder for positionals and other un-named options.
    pub(crate) fn display_name(&self) -> String {
        if !self.name.is_empty() {
            self.name.clone()
        } else {
            self.value_desc
                .clone()
                .unwrap_or_else(|| "<positional>".to_string())
        }
    }
}

/// Parse-time counters, shared by every option kind.
#[derive(Debug, Default)]
pub(crate) struct OccurrenceState {
    pub count: u32,
    pub position: usize,
}

/// Cardinality enforcement applied before any value reaches storage.
///
/// Multi-value continuations update the position without counting as a new
/// occurrence; `DefaultOption` options may be overridden any number of
/// times.
pub(crate) fn record_occurrence(
    descriptor: &Descriptor,
    state: &mut OccurrenceState,
    position: usize,
    multi_arg: bool,
) -> Result<(), ParseError> {
    if multi_arg {
        state.position = position;
        return Ok(());
    }

    if descriptor.occurrences.single() && state.count >= 1 && !descriptor.misc.default_option {
        return Err(ParseError::DuplicateOccurrence {
            name: descriptor.display_name(),
        });
    }

    state.count += 1;
    state.position = position;
    Ok(())
}

/// The type-erased option record the registry holds and the engine
/// dispatches through.
#[doc(hidden)]
pub trait OptionHandle: Send + Sync {
    fn descriptor(&self) -> &Descriptor;

    /// Occurrences recorded during the current parse.
    fn occurrences_seen(&self) -> u32;

    /// Argv index of the most recent occurrence.
    fn last_position(&self) -> usize;

    /// The declared value expectation, or the parser's default.
    fn effective_value_expected(&self) -> ValueExpected;

    /// Placeholder for help output (`int` in `-n=<int>`), when any.
    fn value_placeholder(&self) -> Option<String>;

    /// Names contributed to the naming surface by a mapping parser on an
    /// un-named option.
    fn literal_names(&self) -> Vec<String>;

    /// `(literal, description)` pairs for help output.
    fn literal_help(&self) -> Vec<(String, String)>;

    /// Lookahead probe for optional-value consumption.
    fn would_accept(&self, raw: &str) -> bool;

    /// Enforce cardinality, then parse and store one value.
    fn add_occurrence(
        &self,
        position: usize,
        matched_name: &str,
        value: &str,
        multi_arg: bool,
    ) -> Result<(), ParseError>;

    /// Restore storage to the declared default.
    fn set_default(&self);

    /// Clear parse-time counters without touching storage.
    fn reset_occurrences(&self);

    /// `set_default` plus `reset_occurrences`.
    fn reset(&self) {
        self.set_default();
        self.reset_occurrences();
    }

    /// Rendered `-name = value` plus whether it differs from the default.
    /// `None` for kinds that do not track printable values.
    fn value_summary(&self) -> Option<(String, bool)>;
}

/// Anything that can stand in for a registered option (alias targets).
pub trait OptionRef {
    #[doc(hidden)]
    fn as_handle(&self) -> Arc<dyn OptionHandle>;
}

/// Shared external storage: a cell the caller keeps and the option writes
/// through on every occurrence.
pub struct Location<T> {
    cell: Arc<Mutex<T>>,
}

impl<T> Clone for Location<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Location<T> {
    pub fn new(initial: T) -> Self {
        Self {
            cell: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.lock().unwrap().clone()
    }

    pub(crate) fn set(&self, value: T) {
        *self.cell.lock().unwrap() = value;
    }
}

impl<T: Default> Default for Location<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Descriptor under construction; each kind's builder wraps one.
pub(crate) struct BuilderBase {
    pub name: String,
    pub help: String,
    pub value_desc: Option<String>,
    pub occurrences: Occurrences,
    pub value_expected: ValueExpected,
    pub hidden: Hidden,
    pub formatting: Formatting,
    pub misc: Misc,
    pub additional_values: u32,
    pub categories: Vec<Category>,
    pub subs: Vec<SubCommand>,
    pub builtin: Option<Builtin>,
}

impl BuilderBase {
    pub(crate) fn named(name: impl Into<String>, occurrences: Occurrences) -> Self {
        Self {
            name: name.into(),
            help: String::default(),
            value_desc: None,
            occurrences,
            value_expected: ValueExpected::Unspecified,
            hidden: Hidden::Visible,
            formatting: Formatting::Normal,
            misc: Misc::default(),
            additional_values: 0,
            categories: Vec::default(),
            subs: Vec::default(),
            builtin: None,
        }
    }

    pub(crate) fn positional(value_desc: impl Into<String>, occurrences: Occurrences) -> Self {
        let mut base = Self::named("", occurrences);
        base.value_desc = Some(value_desc.into());
        base.formatting = Formatting::Positional;
        base
    }

    pub(crate) fn finish(self, has_literals: bool) -> Result<Descriptor, ConfigError> {
        let descriptor = Descriptor {
            name: self.name,
            help: self.help,
            value_desc: self.value_desc,
            occurrences: self.occurrences,
            value_expected: self.value_expected,
            hidden: AtomicU8::new(self.hidden as u8),
            formatting: self.formatting,
            misc: self.misc,
            additional_values: self.additional_values,
            categories: self.categories,
            subs: self.subs,
            builtin: self.builtin,
        };
        validate(&descriptor, has_literals)?;
        Ok(descriptor)
    }
}

fn validate(descriptor: &Descriptor, has_literals: bool) -> Result<(), ConfigError> {
    if descriptor.misc.grouping && descriptor.name.chars().count() != 1 {
        return Err(ConfigError::GroupingName(descriptor.name.clone()));
    }
    if descriptor.is_positional() && !descriptor.name.is_empty() {
        return Err(ConfigError::NamedPositional(descriptor.name.clone()));
    }
    if descriptor.misc.sink && !descriptor.name.is_empty() {
        return Err(ConfigError::NamedSink(descriptor.name.clone()));
    }
    if descriptor.misc.positional_eats_args
        && !matches!(
            descriptor.occurrences,
            Occurrences::ZeroOrMore | Occurrences::OneOrMore
        )
    {
        return Err(ConfigError::EatsArgsCardinality);
    }
    let unnamed_surface = descriptor.is_positional()
        || descriptor.misc.sink
        || descriptor.occurrences == Occurrences::ConsumeAfter
        || has_literals;
    if descriptor.name.is_empty() && !unnamed_surface {
        return Err(ConfigError::UnnamedOption);
    }
    Ok(())
}

/// Modifier methods every kind's builder exposes over its `base`.
macro_rules! builder_modifiers {
    () => {
        /// Set the help text shown by `-help`.
        pub fn desc(mut self, help: impl Into<String>) -> Self {
            self.base.help = help.into();
            self
        }

        /// Set the value placeholder shown in help output.
        pub fn value_desc(mut self, placeholder: impl Into<String>) -> Self {
            self.base.value_desc = Some(placeholder.into());
            self
        }

        pub fn occurrences(mut self, occurrences: $crate::model::Occurrences) -> Self {
            self.base.occurrences = occurrences;
            self
        }

        pub fn required(self) -> Self {
            self.occurrences($crate::model::Occurrences::Required)
        }

        pub fn zero_or_more(self) -> Self {
            self.occurrences($crate::model::Occurrences::ZeroOrMore)
        }

        pub fn one_or_more(self) -> Self {
            self.occurrences($crate::model::Occurrences::OneOrMore)
        }

        pub fn value_expected(mut self, expected: $crate::model::ValueExpected) -> Self {
            self.base.value_expected = expected;
            self
        }

        pub fn value_required(self) -> Self {
            self.value_expected($crate::model::ValueExpected::Required)
        }

        pub fn value_optional(self) -> Self {
            self.value_expected($crate::model::ValueExpected::Optional)
        }

        pub fn value_disallowed(self) -> Self {
            self.value_expected($crate::model::ValueExpected::Disallowed)
        }

        /// Hide from `-help` (still shown by `-help-hidden`).
        pub fn hidden(mut self) -> Self {
            self.base.hidden = $crate::model::Hidden::Hidden;
            self
        }

        /// Hide from every help listing.
        pub fn really_hidden(mut self) -> Self {
            self.base.hidden = $crate::model::Hidden::ReallyHidden;
            self
        }

        /// The option name may directly prefix its value (`-Lfoo`).
        pub fn prefix(mut self) -> Self {
            self.base.formatting = $crate::model::Formatting::Prefix;
            self
        }

        /// Like `prefix`, but the `name=value` form is rejected.
        pub fn always_prefix(mut self) -> Self {
            self.base.formatting = $crate::model::Formatting::AlwaysPrefix;
            self
        }

        /// Single-char option that may bunch under one dash (`-lah`).
        pub fn grouping(mut self) -> Self {
            self.base.misc.grouping = true;
            self
        }

        /// Later occurrences override instead of erroring.
        pub fn default_option(mut self) -> Self {
            self.base.misc.default_option = true;
            self
        }

        /// Attach a display category (defaults to the General category).
        pub fn category(mut self, category: &$crate::registry::Category) -> Self {
            self.base.categories.push(category.clone());
            self
        }

        /// Restrict to a subcommand scope; `SubCommand::all()` means every
        /// scope.
        pub fn sub(mut self, sub: &$crate::registry::SubCommand) -> Self {
            self.base.subs.push(sub.clone());
            self
        }
    };
}

pub(crate) use builder_modifiers;
