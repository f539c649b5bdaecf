//! Aliases: thin forwarders to a registered option.
//!
//! An alias holds a handle to its target and forwards every occurrence;
//! categories and subcommand membership are copied from the target at
//! registration time. Aliases are hidden by default.

use std::sync::Arc;

use crate::error::{ConfigError, ParseError};
use crate::model::{Hidden, Occurrences, ValueExpected};
use crate::option::{BuilderBase, Descriptor, OptionHandle, OptionRef};
use crate::registry;

pub(crate) struct AliasCore {
    descriptor: Descriptor,
    target: Arc<dyn OptionHandle>,
}

impl OptionHandle for AliasCore {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    // Occurrence bookkeeping lives on the target: an alias and its target
    // are indistinguishable in their storage effects.
    fn occurrences_seen(&self) -> u32 {
        self.target.occurrences_seen()
    }

    fn last_position(&self) -> usize {
        self.target.last_position()
    }

    fn effective_value_expected(&self) -> ValueExpected {
        match self.descriptor.value_expected {
            ValueExpected::Unspecified => self.target.effective_value_expected(),
            declared => declared,
        }
    }

    fn value_placeholder(&self) -> Option<String> {
        self.target.value_placeholder()
    }

    fn literal_names(&self) -> Vec<String> {
        Vec::default()
    }

    fn literal_help(&self) -> Vec<(String, String)> {
        self.target.literal_help()
    }

    fn would_accept(&self, raw: &str) -> bool {
        self.target.would_accept(raw)
    }

    fn add_occurrence(
        &self,
        position: usize,
        _matched_name: &str,
        value: &str,
        multi_arg: bool,
    ) -> Result<(), ParseError> {
        let target_name = self.target.descriptor().name.clone();
        self.target
            .add_occurrence(position, &target_name, value, multi_arg)
    }

    fn set_default(&self) {
        self.target.set_default();
    }

    fn reset_occurrences(&self) {
        self.target.reset_occurrences();
    }

    fn value_summary(&self) -> Option<(String, bool)> {
        // The target prints its own value.
        None
    }
}

/// A registered alias; cheap to clone.
#[derive(Clone)]
pub struct Alias {
    core: Arc<AliasCore>,
}

impl std::fmt::Debug for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alias")
            .field("name", &self.core.descriptor.name)
            .finish()
    }
}

impl Alias {
    /// Start declaring an alias under `name`.
    pub fn build(name: impl Into<String>) -> AliasBuilder {
        let mut base = BuilderBase::named(name, Occurrences::Optional);
        base.hidden = Hidden::Hidden;
        AliasBuilder { base, target: None }
    }

    /// Unregister; valid only for the most recently registered option in
    /// each of its scopes. A testing affordance.
    pub fn unregister(&self) -> Result<(), ConfigError> {
        registry::unregister_option(&self.as_handle())
    }
}

impl OptionRef for Alias {
    fn as_handle(&self) -> Arc<dyn OptionHandle> {
        Arc::clone(&self.core) as Arc<dyn OptionHandle>
    }
}

/// Declares an alias.
pub struct AliasBuilder {
    base: BuilderBase,
    target: Option<Arc<dyn OptionHandle>>,
}

impl AliasBuilder {
    /// Set the help text shown by `-help-hidden`.
    pub fn desc(mut self, help: impl Into<String>) -> Self {
        self.base.help = help.into();
        self
    }

    /// Show the alias in plain `-help` output.
    pub fn visible(mut self) -> Self {
        self.base.hidden = Hidden::Visible;
        self
    }

    /// Hide from every help listing.
    pub fn really_hidden(mut self) -> Self {
        self.base.hidden = Hidden::ReallyHidden;
        self
    }

    /// The option this alias forwards to.
    pub fn to(mut self, target: &impl OptionRef) -> Self {
        self.target = Some(target.as_handle());
        self
    }

    /// Register, surfacing configuration mistakes.
    pub fn try_register(self) -> Result<Alias, ConfigError> {
        if self.base.name.is_empty() {
            return Err(ConfigError::UnnamedAlias);
        }
        if !self.base.subs.is_empty() {
            return Err(ConfigError::AliasWithSub(self.base.name));
        }
        let target = match self.target {
            Some(target) => target,
            None => return Err(ConfigError::AliasWithoutTarget(self.base.name)),
        };

        let mut base = self.base;
        // Scope membership and built-in behavior follow the target.
        base.categories = target.descriptor().categories.clone();
        base.subs = target.descriptor().subs.clone();
        base.builtin = target.descriptor().builtin;
        let descriptor = base.finish(false)?;

        let core = Arc::new(AliasCore { descriptor, target });
        registry::register_option(Arc::clone(&core) as Arc<dyn OptionHandle>)?;
        Ok(Alias { core })
    }

    /// Register; configuration mistakes are fatal.
    pub fn register(self) -> Alias {
        match self.try_register() {
            Ok(alias) => alias,
            Err(error) => panic!("{error}"),
        }
    }
}

/// Construct a built-in alias (`-h` for `-help`).
pub(crate) fn builtin_alias(name: &str, target: Arc<dyn OptionHandle>) -> Arc<dyn OptionHandle> {
    let mut base = BuilderBase::named(name, Occurrences::Optional);
    base.help = format!(
        "alias for -{target}",
        target = target.descriptor().name
    );
    base.hidden = Hidden::Hidden;
    base.misc.default_option = true;
    base.builtin = target.descriptor().builtin;
    let descriptor = base
        .finish(false)
        .expect("built-in alias descriptors are statically valid");
    Arc::new(AliasCore { descriptor, target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::Opt;
    use crate::registry::SubCommand;
    use assert_matches::assert_matches;

    #[test]
    fn forwards_to_target() {
        let sub = SubCommand::detached("alias-forward", "");
        let output = Opt::<String>::build("output")
            .sub(&sub)
            .try_register()
            .unwrap();
        let alias = Alias::build("o").to(&output).try_register().unwrap();

        alias
            .as_handle()
            .add_occurrence(3, "o", "a.out", false)
            .unwrap();

        assert_eq!(output.value(), "a.out");
        assert_eq!(output.occurrences(), 1);
        assert_eq!(output.position(), 3);
        assert_eq!(alias.as_handle().occurrences_seen(), 1);
    }

    #[test]
    fn alias_registers_into_target_scopes() {
        let sub = SubCommand::detached("alias-scope", "");
        let output = Opt::<String>::build("output")
            .sub(&sub)
            .try_register()
            .unwrap();
        let _alias = Alias::build("o").to(&output).try_register().unwrap();

        assert!(sub.lookup("o").is_some());
        assert!(sub.lookup("output").is_some());
    }

    #[test]
    fn alias_needs_target_and_name() {
        assert_matches!(
            Alias::build("o").try_register(),
            Err(ConfigError::AliasWithoutTarget(name)) => assert_eq!(name, "o")
        );
        assert_matches!(
            Alias::build("").try_register(),
            Err(ConfigError::UnnamedAlias)
        );
    }

    #[test]
    fn cardinality_is_enforced_on_the_target() {
        let sub = SubCommand::detached("alias-cardinality", "");
        let output = Opt::<String>::build("output")
            .sub(&sub)
            .try_register()
            .unwrap();
        let alias = Alias::build("o").to(&output).try_register().unwrap();

        output
            .as_handle()
            .add_occurrence(0, "output", "one", false)
            .unwrap();
        assert_matches!(
            alias.as_handle().add_occurrence(1, "o", "two", false),
            Err(ParseError::DuplicateOccurrence { name }) => assert_eq!(name, "output")
        );
    }
}
