//! List options: one stored value per occurrence, with per-occurrence
//! argv positions.

use std::sync::{Arc, Mutex};

use crate::error::{ConfigError, ParseError};
use crate::model::{Occurrences, ValueExpected};
use crate::option::{
    builder_modifiers, record_occurrence, BuilderBase, Descriptor, Location, OccurrenceState,
    OptionHandle, OptionRef,
};
use crate::registry;
use crate::value::{FromArgv, LiteralParser, ValueParser};

/// Bounds every list element type satisfies.
pub trait ListValue: Clone + Send + Sync + 'static {}

impl<T> ListValue for T where T: Clone + Send + Sync + 'static {}

struct ListStorage<T> {
    values: Vec<T>,
    positions: Vec<usize>,
    default: Vec<T>,
    // True while `values` still holds the declared default contents; the
    // first real occurrence clears them.
    default_assigned: bool,
}

pub(crate) struct ListCore<T: ListValue> {
    descriptor: Descriptor,
    parser: Box<dyn ValueParser<T>>,
    state: Mutex<OccurrenceState>,
    storage: Mutex<ListStorage<T>>,
    location: Option<Location<Vec<T>>>,
    callback: Option<Box<dyn Fn(&T) + Send + Sync>>,
}

impl<T: ListValue> OptionHandle for ListCore<T> {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn occurrences_seen(&self) -> u32 {
        self.state.lock().unwrap().count
    }

    fn last_position(&self) -> usize {
        self.state.lock().unwrap().position
    }

    fn effective_value_expected(&self) -> ValueExpected {
        match self.descriptor.value_expected {
            ValueExpected::Unspecified => self
                .parser
                .default_value_expected(!self.descriptor.name.is_empty()),
            declared => declared,
        }
    }

    fn value_placeholder(&self) -> Option<String> {
        self.descriptor
            .value_desc
            .clone()
            .or_else(|| self.parser.value_name())
    }

    fn literal_names(&self) -> Vec<String> {
        self.parser.literal_names()
    }

    fn literal_help(&self) -> Vec<(String, String)> {
        self.parser.literal_help()
    }

    fn would_accept(&self, raw: &str) -> bool {
        self.parser.accepts(raw)
    }

    fn add_occurrence(
        &self,
        position: usize,
        matched_name: &str,
        value: &str,
        multi_arg: bool,
    ) -> Result<(), ParseError> {
        record_occurrence(
            &self.descriptor,
            &mut self.state.lock().unwrap(),
            position,
            multi_arg,
        )?;
        let parsed = self
            .parser
            .parse(&self.descriptor.name, matched_name, value)
            .map_err(|message| ParseError::ParseFailure {
                name: self.descriptor.display_name(),
                message,
            })?;
        if let Some(callback) = &self.callback {
            callback(&parsed);
        }
        let mut storage = self.storage.lock().unwrap();
        if storage.default_assigned {
            storage.values.clear();
            storage.positions.clear();
            storage.default_assigned = false;
        }
        storage.values.push(parsed);
        storage.positions.push(position);
        if let Some(location) = &self.location {
            location.set(storage.values.clone());
        }
        Ok(())
    }

    fn set_default(&self) {
        let mut storage = self.storage.lock().unwrap();
        storage.values = storage.default.clone();
        storage.positions.clear();
        storage.default_assigned = true;
        if let Some(location) = &self.location {
            location.set(storage.values.clone());
        }
    }

    fn reset_occurrences(&self) {
        *self.state.lock().unwrap() = OccurrenceState::default();
    }

    fn value_summary(&self) -> Option<(String, bool)> {
        // List contents are not rendered by the option printers.
        None
    }
}

/// A registered list option; cheap to clone.
pub struct OptList<T: ListValue> {
    core: Arc<ListCore<T>>,
}

impl<T: ListValue> std::fmt::Debug for OptList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptList")
            .field("name", &self.core.descriptor.name)
            .finish()
    }
}

impl<T: ListValue> Clone for OptList<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: ListValue> OptList<T> {
    /// Start declaring a named list option.
    pub fn build(name: impl Into<String>) -> ListBuilder<T>
    where
        T: FromArgv,
    {
        ListBuilder::new(
            BuilderBase::named(name, Occurrences::ZeroOrMore),
            Some(T::default_parser()),
        )
    }

    /// Start declaring a positional list, displayed as `placeholder`.
    pub fn positional(placeholder: impl Into<String>) -> ListBuilder<T>
    where
        T: FromArgv,
    {
        ListBuilder::new(
            BuilderBase::positional(placeholder, Occurrences::ZeroOrMore),
            Some(T::default_parser()),
        )
    }

    /// Start declaring a sink: receives every token nothing else claims.
    pub fn sink(placeholder: impl Into<String>) -> ListBuilder<T>
    where
        T: FromArgv,
    {
        let mut base = BuilderBase::named("", Occurrences::ZeroOrMore);
        base.value_desc = Some(placeholder.into());
        base.misc.sink = true;
        ListBuilder::new(base, Some(T::default_parser()))
    }

    /// Start declaring a trailing option: once the required positionals are
    /// satisfied, it receives every remaining token verbatim.
    pub fn trailing(placeholder: impl Into<String>) -> ListBuilder<T>
    where
        T: FromArgv,
    {
        let mut base = BuilderBase::named("", Occurrences::ConsumeAfter);
        base.value_desc = Some(placeholder.into());
        ListBuilder::new(base, Some(T::default_parser()))
    }

    /// Start declaring a list whose values come from `literal` entries.
    pub fn from_values(name: impl Into<String>) -> ListBuilder<T> {
        let mut builder = ListBuilder::new(BuilderBase::named(name, Occurrences::ZeroOrMore), None);
        builder.literals = Some(LiteralParser::default());
        builder
    }

    /// Snapshot of the collected values.
    pub fn values(&self) -> Vec<T> {
        self.core.storage.lock().unwrap().values.clone()
    }

    /// Argv positions of the collected values, in collection order.
    pub fn positions(&self) -> Vec<usize> {
        self.core.storage.lock().unwrap().positions.clone()
    }

    /// Occurrences recorded during the current parse.
    pub fn occurrences(&self) -> u32 {
        self.core.occurrences_seen()
    }

    /// Unregister; valid only for the most recently registered option in
    /// each of its scopes. A testing affordance.
    pub fn unregister(&self) -> Result<(), ConfigError> {
        registry::unregister_option(&self.as_handle())
    }
}

impl<T: ListValue> OptionRef for OptList<T> {
    fn as_handle(&self) -> Arc<dyn OptionHandle> {
        Arc::clone(&self.core) as Arc<dyn OptionHandle>
    }
}

/// Declares a list option.
pub struct ListBuilder<T: ListValue> {
    base: BuilderBase,
    parser: Option<Box<dyn ValueParser<T>>>,
    literals: Option<LiteralParser<T>>,
    init: Vec<T>,
    location: Option<Location<Vec<T>>>,
    deferred: Option<ConfigError>,
    callback: Option<Box<dyn Fn(&T) + Send + Sync>>,
}

impl<T: ListValue> ListBuilder<T> {
    fn new(base: BuilderBase, parser: Option<Box<dyn ValueParser<T>>>) -> Self {
        Self {
            base,
            parser,
            literals: None,
            init: Vec::default(),
            location: None,
            deferred: None,
            callback: None,
        }
    }

    builder_modifiers!();

    /// Declare the default (reset) contents.
    pub fn list_init(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.init = values.into_iter().collect();
        self
    }

    /// Split each raw value at commas, dispatching once per piece.
    pub fn comma_separated(mut self) -> Self {
        self.base.misc.comma_separated = true;
        self
    }

    /// Let this positional swallow option-like tokens once it has begun.
    pub fn positional_eats_args(mut self) -> Self {
        self.base.misc.positional_eats_args = true;
        self
    }

    /// Consume `count` extra consecutive tokens per occurrence.
    pub fn multi_val(mut self, count: u32) -> Self {
        self.base.additional_values = count;
        self
    }

    /// Mirror the collected values into external shared storage.
    pub fn location(mut self, location: Location<Vec<T>>) -> Self {
        if self.location.replace(location).is_some() {
            self.deferred
                .replace(ConfigError::SecondLocation(self.base.name.clone()));
        }
        self
    }

    /// Invoke `callback` with each parsed value.
    pub fn callback(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Replace the value parser.
    pub fn parser(mut self, parser: impl ValueParser<T> + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Add a literal spelling mapped to `value`.
    pub fn literal(mut self, name: impl Into<String>, value: T, help: impl Into<String>) -> Self {
        let literals = self.literals.get_or_insert_with(LiteralParser::default);
        if let Err(duplicate) = literals.insert(name, value, help) {
            self.deferred.replace(ConfigError::DuplicateLiteral(duplicate));
        }
        self
    }

    /// Register, surfacing configuration mistakes.
    pub fn try_register(self) -> Result<OptList<T>, ConfigError> {
        if let Some(error) = self.deferred {
            return Err(error);
        }
        let descriptor = self.base.finish(self.literals.is_some())?;
        let parser: Box<dyn ValueParser<T>> = match self.literals {
            Some(literals) => Box::new(literals),
            None => self
                .parser
                .expect("list builders always start with a parser or literals"),
        };
        let core = Arc::new(ListCore {
            descriptor,
            parser,
            state: Mutex::new(OccurrenceState::default()),
            storage: Mutex::new(ListStorage {
                values: self.init.clone(),
                default: self.init,
                positions: Vec::default(),
                default_assigned: true,
            }),
            location: self.location,
            callback: self.callback,
        });
        if let Some(location) = &core.location {
            location.set(core.storage.lock().unwrap().values.clone());
        }
        registry::register_option(Arc::clone(&core) as Arc<dyn OptionHandle>)?;
        Ok(OptList { core })
    }

    /// Register; configuration mistakes are fatal.
    pub fn register(self) -> OptList<T> {
        match self.try_register() {
            Ok(list) => list,
            Err(error) => panic!("{error}"),
        }
    }
}
