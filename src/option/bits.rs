//! Bit-set options: each occurrence ORs a bit into shared storage.

use std::sync::{Arc, Mutex};

use crate::error::{ConfigError, ParseError};
use crate::model::{Occurrences, ValueExpected};
use crate::option::{
    builder_modifiers, record_occurrence, BuilderBase, Descriptor, Location, OccurrenceState,
    OptionHandle, OptionRef,
};
use crate::registry;
use crate::value::{FromArgv, LiteralParser, ValueParser};

/// Maps a value to its bit position; positions must stay below 32.
pub trait BitIndexed: Copy + Send + Sync + 'static {
    fn bit_index(&self) -> u32;
}

struct BitsStorage {
    bits: u32,
}

pub(crate) struct BitsCore<E: BitIndexed> {
    descriptor: Descriptor,
    parser: Box<dyn ValueParser<E>>,
    state: Mutex<OccurrenceState>,
    storage: Mutex<BitsStorage>,
    location: Option<Location<u32>>,
}

impl<E: BitIndexed> OptionHandle for BitsCore<E> {
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
        let index = parsed.bit_index();
        debug_assert!(index < u32::BITS, "bit position exceeds the bit vector");
        let mut storage = self.storage.lock().unwrap();
        storage.bits |= 1 << index;
        if let Some(location) = &self.location {
            location.set(storage.bits);
        }
        Ok(())
    }

    fn set_default(&self) {
        let mut storage = self.storage.lock().unwrap();
        storage.bits = 0;
        if let Some(location) = &self.location {
            location.set(0);
        }
    }

    fn reset_occurrences(&self) {
        *self.state.lock().unwrap() = OccurrenceState::default();
    }

    fn value_summary(&self) -> Option<(String, bool)> {
        None
    }
}

/// A registered bit-set option; cheap to clone.
pub struct OptBits<E: BitIndexed> {
    core: Arc<BitsCore<E>>,
}

impl<E: BitIndexed> Clone for OptBits<E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<E: BitIndexed> OptBits<E> {
    /// Start declaring a named bit-set option.
    pub fn build(name: impl Into<String>) -> BitsBuilder<E>
    where
        E: FromArgv,
    {
        BitsBuilder::new(
            BuilderBase::named(name, Occurrences::ZeroOrMore),
            Some(E::default_parser()),
        )
    }

    /// Start declaring a bit-set whose values come from `literal` entries.
    /// An empty name makes the literals themselves the naming surface.
    pub fn from_values(name: impl Into<String>) -> BitsBuilder<E> {
        let mut builder = BitsBuilder::new(BuilderBase::named(name, Occurrences::ZeroOrMore), None);
        builder.literals = Some(LiteralParser::default());
        builder
    }

    /// The accumulated bit vector.
    pub fn bits(&self) -> u32 {
        self.core.storage.lock().unwrap().bits
    }

    /// Whether `value`'s bit has been set.
    pub fn is_set(&self, value: E) -> bool {
        self.bits() & (1 << value.bit_index()) != 0
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

impl<E: BitIndexed> OptionRef for OptBits<E> {
    fn as_handle(&self) -> Arc<dyn OptionHandle> {
        Arc::clone(&self.core) as Arc<dyn OptionHandle>
    }
}

/// Declares a bit-set option.
pub struct BitsBuilder<E: BitIndexed> {
    base: BuilderBase,
    parser: Option<Box<dyn ValueParser<E>>>,
    literals: Option<LiteralParser<E>>,
    location: Option<Location<u32>>,
    deferred: Option<ConfigError>,
}

impl<E: BitIndexed> BitsBuilder<E> {
    fn new(base: BuilderBase, parser: Option<Box<dyn ValueParser<E>>>) -> Self {
        Self {
            base,
            parser,
            literals: None,
            location: None,
            deferred: None,
        }
    }

    builder_modifiers!();

    /// Mirror the bit vector into external shared storage.
    pub fn location(mut self, location: Location<u32>) -> Self {
        if self.location.replace(location).is_some() {
            self.deferred
                .replace(ConfigError::SecondLocation(self.base.name.clone()));
        }
        self
    }

    /// Add a literal spelling mapped to `value`.
    pub fn literal(mut self, name: impl Into<String>, value: E, help: impl Into<String>) -> Self {
        let literals = self.literals.get_or_insert_with(LiteralParser::default);
        if let Err(duplicate) = literals.insert(name, value, help) {
            self.deferred.replace(ConfigError::DuplicateLiteral(duplicate));
        }
        self
    }

    /// Register, surfacing configuration mistakes.
    pub fn try_register(self) -> Result<OptBits<E>, ConfigError> {
        if let Some(error) = self.deferred {
            return Err(error);
        }
        let descriptor = self.base.finish(self.literals.is_some())?;
        let parser: Box<dyn ValueParser<E>> = match self.literals {
            Some(literals) => Box::new(literals),
            None => self
                .parser
                .expect("bits builders always start with a parser or literals"),
        };
        let core = Arc::new(BitsCore {
            descriptor,
            parser,
            state: Mutex::new(OccurrenceState::default()),
            storage: Mutex::new(BitsStorage { bits: 0 }),
            location: self.location,
        });
        registry::register_option(Arc::clone(&core) as Arc<dyn OptionHandle>)?;
        Ok(OptBits { core })
    }

    /// Register; configuration mistakes are fatal.
    pub fn register(self) -> OptBits<E> {
        match self.try_register() {
            Ok(bits) => bits,
            Err(error) => panic!("{error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubCommand;

    #[derive(Clone, Copy, PartialEq, Debug)]
    enum Check {
        Bounds,
        Overflow,
        Aliasing,
    }

    impl BitIndexed for Check {
        fn bit_index(&self) -> u32 {
            *self as u32
        }
    }

    fn checks(sub: &SubCommand) -> OptBits<Check> {
        OptBits::<Check>::from_values("check")
            .literal("bounds", Check::Bounds, "bounds checks")
            .literal("overflow", Check::Overflow, "overflow checks")
            .literal("aliasing", Check::Aliasing, "aliasing checks")
            .sub(sub)
            .try_register()
            .unwrap()
    }

    #[test]
    fn accumulates_bits() {
        let sub = SubCommand::detached("bits-accumulate", "");
        let check = checks(&sub);
        let handle = check.as_handle();

        handle.add_occurrence(0, "check", "bounds", false).unwrap();
        handle.add_occurrence(1, "check", "aliasing", false).unwrap();

        assert!(check.is_set(Check::Bounds));
        assert!(!check.is_set(Check::Overflow));
        assert!(check.is_set(Check::Aliasing));
        assert_eq!(check.bits(), 0b101);
    }

    #[test]
    fn reset_clears_bits() {
        let sub = SubCommand::detached("bits-reset", "");
        let check = checks(&sub);
        let handle = check.as_handle();

        handle.add_occurrence(0, "check", "overflow", false).unwrap();
        handle.reset();
        assert_eq!(check.bits(), 0);
        assert_eq!(check.occurrences(), 0);
    }

    #[test]
    fn location_mirrors_bits() {
        let sub = SubCommand::detached("bits-location", "");
        let mirror = Location::new(0u32);
        let check = OptBits::<Check>::from_values("check")
            .literal("bounds", Check::Bounds, "")
            .location(mirror.clone())
            .sub(&sub)
            .try_register()
            .unwrap();

        check.as_handle().add_occurrence(0, "check", "bounds", false).unwrap();
        assert_eq!(mirror.get(), 0b1);
    }
}
