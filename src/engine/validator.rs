//! Post-parse constraint checks.

use crate::engine::resolver::Scope;
use crate::error::ParseError;

/// A consume-after option is meaningful only alongside at least one
/// required positional; checked before the token walk begins.
pub(crate) fn check_consume_after(scope: &Scope) -> Result<(), ParseError> {
    if scope.consume_after().is_none() {
        return Ok(());
    }
    let demand: u32 = scope
        .positionals()
        .iter()
        .map(|positional| positional.descriptor().occurrences.minimum())
        .sum();
    if demand == 0 {
        return Err(ParseError::ConsumeAfterWithoutPositional);
    }
    Ok(())
}

/// After the token stream is exhausted: every required option and
/// positional must have been satisfied.
pub(crate) fn validate(scope: &Scope) -> Result<(), ParseError> {
    for handle in scope.options() {
        let descriptor = handle.descriptor();
        if descriptor.occurrences.minimum() > handle.occurrences_seen() {
            let name = descriptor.display_name();
            return Err(if descriptor.is_positional() {
                ParseError::MissingPositional { name }
            } else {
                ParseError::MissingRequired { name }
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{Opt, OptList, OptionRef};
    use crate::registry::SubCommand;
    use assert_matches::assert_matches;

    #[test]
    fn consume_after_needs_required_positional() {
        let sub = SubCommand::detached("validator-ca", "");
        OptList::<String>::trailing("args")
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub.clone(), None);
        assert_matches!(
            check_consume_after(&scope),
            Err(ParseError::ConsumeAfterWithoutPositional)
        );

        Opt::<String>::positional("file")
            .required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);
        check_consume_after(&scope).unwrap();
    }

    #[test]
    fn missing_required_option() {
        let sub = SubCommand::detached("validator-required", "");
        let level = Opt::<u32>::build("level")
            .required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        assert_matches!(
            validate(&scope),
            Err(ParseError::MissingRequired { name }) => assert_eq!(name, "level")
        );

        level
            .as_handle()
            .add_occurrence(0, "level", "2", false)
            .unwrap();
        validate(&scope).unwrap();
    }

    #[test]
    fn missing_required_positional() {
        let sub = SubCommand::detached("validator-positional", "");
        Opt::<String>::positional("file")
            .required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        assert_matches!(
            validate(&scope),
            Err(ParseError::MissingPositional { name }) => assert_eq!(name, "file")
        );
    }

    #[test]
    fn optional_kinds_are_always_satisfied() {
        let sub = SubCommand::detached("validator-optional", "");
        Opt::<u32>::build("level").sub(&sub).try_register().unwrap();
        OptList::<String>::build("include")
            .sub(&sub)
            .try_register()
            .unwrap();
        Opt::<String>::positional("file").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        validate(&scope).unwrap();
    }
}
