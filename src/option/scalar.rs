//! Scalar options: a single typed value with a declared default.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{ConfigError, ParseError};
use crate::model::{Hidden, Occurrences, ValueExpected};
use crate::option::{
    builder_modifiers, record_occurrence, Builtin, BuilderBase, Descriptor, Location,
    OccurrenceState, OptionHandle, OptionRef,
};
use crate::registry;
use crate::value::{FromArgv, LiteralParser, StringParser, ValueParser};

/// Bounds every scalar storage type satisfies.
pub trait ScalarValue:
    Clone + Default + fmt::Display + PartialEq + Send + Sync + 'static
{
}

impl<T> ScalarValue for T where T: Clone + Default + fmt::Display + PartialEq + Send + Sync + 'static {}

struct ScalarStorage<T> {
    value: T,
    default: Option<T>,
}

pub(crate) struct ScalarCore<T: ScalarValue> {
    descriptor: Descriptor,
    parser: Box<dyn ValueParser<T>>,
    state: Mutex<OccurrenceState>,
    storage: Mutex<ScalarStorage<T>>,
    location: Option<Location<T>>,
    callback: Option<Box<dyn Fn(&T) + Send + Sync>>,
}

impl<T: ScalarValue> ScalarCore<T> {
    fn assign(&self, value: T) {
        if let Some(location) = &self.location {
            location.set(value.clone());
        }
        if let Some(callback) = &self.callback {
            callback(&value);
        }
        self.storage.lock().unwrap().value = value;
    }
}

impl<T: ScalarValue> OptionHandle for ScalarCore<T> {
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
        self.assign(parsed);
        Ok(())
    }

    fn set_default(&self) {
        let default = {
            let storage = self.storage.lock().unwrap();
            storage.default.clone().unwrap_or_default()
        };
        if let Some(location) = &self.location {
            location.set(default.clone());
        }
        self.storage.lock().unwrap().value = default;
    }

    fn reset_occurrences(&self) {
        *self.state.lock().unwrap() = OccurrenceState::default();
    }

    fn value_summary(&self) -> Option<(String, bool)> {
        if self.descriptor.name.is_empty() {
            return None;
        }
        let storage = self.storage.lock().unwrap();
        let differs = match &storage.default {
            Some(default) => storage.value != *default,
            None => storage.value != T::default(),
        };
        Some((
            format!(
                "-{name} = {value}",
                name = self.descriptor.name,
                value = storage.value
            ),
            differs,
        ))
    }
}

/// A registered scalar option; cheap to clone.
pub struct Opt<T: ScalarValue> {
    core: Arc<ScalarCore<T>>,
}

impl<T: ScalarValue> std::fmt::Debug for Opt<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opt")
            .field("name", &self.core.descriptor.name)
            .finish()
    }
}

impl<T: ScalarValue> Clone for Opt<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: ScalarValue> Opt<T> {
    /// Start declaring a named scalar option.
    pub fn build(name: impl Into<String>) -> OptBuilder<T>
    where
        T: FromArgv,
    {
        OptBuilder::new(
            BuilderBase::named(name, Occurrences::Optional),
            Some(T::default_parser()),
        )
    }

    /// Start declaring a positional scalar, displayed as `placeholder`.
    pub fn positional(placeholder: impl Into<String>) -> OptBuilder<T>
    where
        T: FromArgv,
    {
        OptBuilder::new(
            BuilderBase::positional(placeholder, Occurrences::Optional),
            Some(T::default_parser()),
        )
    }

    /// Start declaring an option whose values come from `literal` entries
    /// instead of a per-type parser. An empty name makes the literals
    /// themselves the naming surface.
    pub fn from_values(name: impl Into<String>) -> OptBuilder<T> {
        let mut builder = OptBuilder::new(BuilderBase::named(name, Occurrences::Optional), None);
        builder.literals = Some(LiteralParser::default());
        builder
    }

    /// Snapshot of the current value.
    pub fn value(&self) -> T {
        self.core.storage.lock().unwrap().value.clone()
    }

    /// Occurrences recorded during the current parse.
    pub fn occurrences(&self) -> u32 {
        self.core.occurrences_seen()
    }

    /// Argv index of the most recent occurrence.
    pub fn position(&self) -> usize {
        self.core.last_position()
    }

    /// Unregister; valid only for the most recently registered option in
    /// each of its scopes. A testing affordance.
    pub fn unregister(&self) -> Result<(), ConfigError> {
        registry::unregister_option(&self.as_handle())
    }
}

impl<T: ScalarValue> OptionRef for Opt<T> {
    fn as_handle(&self) -> Arc<dyn OptionHandle> {
        Arc::clone(&self.core) as Arc<dyn OptionHandle>
    }
}

/// Declares a scalar option.
pub struct OptBuilder<T: ScalarValue> {
    base: BuilderBase,
    parser: Option<Box<dyn ValueParser<T>>>,
    literals: Option<LiteralParser<T>>,
    init: Option<T>,
    location: Option<Location<T>>,
    deferred: Option<ConfigError>,
    callback: Option<Box<dyn Fn(&T) + Send + Sync>>,
}

impl<T: ScalarValue> OptBuilder<T> {
    fn new(base: BuilderBase, parser: Option<Box<dyn ValueParser<T>>>) -> Self {
        Self {
            base,
            parser,
            literals: None,
            init: None,
            location: None,
            deferred: None,
            callback: None,
        }
    }

    builder_modifiers!();

    /// Declare the initial (and reset) value.
    pub fn init(mut self, value: T) -> Self {
        self.init = Some(value);
        self
    }

    /// Mirror every stored value into external shared storage.
    pub fn location(mut self, location: Location<T>) -> Self {
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
    pub fn try_register(self) -> Result<Opt<T>, ConfigError> {
        if let Some(error) = self.deferred {
            return Err(error);
        }
        let descriptor = self.base.finish(self.literals.is_some())?;
        let parser: Box<dyn ValueParser<T>> = match self.literals {
            Some(literals) => Box::new(literals),
            None => self
                .parser
                .expect("scalar builders always start with a parser or literals"),
        };
        let core = Arc::new(ScalarCore {
            descriptor,
            parser,
            state: Mutex::new(OccurrenceState::default()),
            storage: Mutex::new(ScalarStorage {
                value: self.init.clone().unwrap_or_default(),
                default: self.init,
            }),
            location: self.location,
            callback: self.callback,
        });
        if let Some(location) = &core.location {
            location.set(core.storage.lock().unwrap().value.clone());
        }
        registry::register_option(Arc::clone(&core) as Arc<dyn OptionHandle>)?;
        Ok(Opt { core })
    }

    /// Register; configuration mistakes are fatal.
    pub fn register(self) -> Opt<T> {
        match self.try_register() {
            Ok(opt) => opt,
            Err(error) => panic!("{error}"),
        }
    }
}

/// Construct a built-in flag surfaced to the entry point.
pub(crate) fn builtin_flag(
    name: &str,
    help: &str,
    value_expected: ValueExpected,
    hidden: Hidden,
    builtin: Builtin,
) -> Arc<dyn OptionHandle> {
    let mut base = BuilderBase::named(name, Occurrences::Optional);
    base.help = help.to_string();
    base.value_expected = value_expected;
    base.hidden = hidden;
    base.misc.default_option = true;
    base.builtin = Some(builtin);
    if value_expected == ValueExpected::Optional {
        base.value_desc = Some("category".to_string());
    }
    let descriptor = base
        .finish(false)
        .expect("built-in descriptors are statically valid");
    Arc::new(ScalarCore::<String> {
        descriptor,
        parser: Box::new(StringParser),
        state: Mutex::new(OccurrenceState::default()),
        storage: Mutex::new(ScalarStorage {
            value: String::default(),
            default: None,
        }),
        location: None,
        callback: None,
    })
}
