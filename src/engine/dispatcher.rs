//! The parse walk: drives the categorizer and resolver, pulls values per
//! each option's expectation, and routes occurrences into storage.

use std::sync::Arc;

use crate::engine::categorizer::{Categorizer, OptText, TokenKind};
use crate::engine::resolver::{self, Resolution, Scope};
use crate::engine::validator;
use crate::error::ParseError;
use crate::model::{Formatting, Occurrences, ValueExpected};
use crate::option::{Builtin, OptionHandle};
use crate::registry::SubCommand;

#[cfg(feature = "debug")]
use tracing::debug;

#[derive(Default)]
pub(crate) struct EngineSettings {
    pub long_options_use_double_dash: bool,
}

/// A built-in option was matched; the entry point renders it.
#[derive(Debug)]
pub(crate) struct BuiltinRequest {
    pub kind: Builtin,
    pub argument: Option<String>,
}

#[derive(Debug)]
pub(crate) enum Outcome {
    /// The walk completed; `-print-options` may have asked for a value
    /// dump (`Some(all)`).
    Success { print_options: Option<bool> },
    /// A help/version built-in was matched; the entry point renders it.
    Builtin(BuiltinRequest),
}

/// If the leading token names a registered subcommand, choose it and
/// report how many tokens were consumed.
pub(crate) fn select_sub_command(
    tokens: &[&str],
    subs: &[SubCommand],
) -> Option<(SubCommand, usize)> {
    let first = *tokens.first()?;
    if first.is_empty() || first.starts_with('-') {
        return None;
    }
    subs.iter()
        .find(|sub| !sub.name().is_empty() && sub.name() == first)
        .map(|sub| (sub.clone(), 1))
}

/// Walk `tokens` against `scope`, dispatching every occurrence, then
/// distribute buffered positional values and validate.
pub(crate) fn dispatch(
    tokens: &[&str],
    scope: &Scope,
    settings: &EngineSettings,
) -> Result<Outcome, ParseError> {
    for handle in scope.options() {
        handle.reset_occurrences();
    }
    validator::check_consume_after(scope)?;

    let positionals = scope.positionals();
    let sinks = scope.sinks();
    let consume_after = scope.consume_after();
    let required_demand: usize = positionals
        .iter()
        .map(|positional| positional.descriptor().occurrences.minimum() as usize)
        .sum();

    let mut categorizer = Categorizer::new(tokens);
    let mut positional_values: Vec<(usize, String)> = Vec::default();
    // One-way for the rest of the parse.
    let mut consuming = false;
    let mut print_options: Option<bool> = None;

    while let Some(token) = categorizer.next() {
        if consuming {
            let trailing = consume_after
                .as_ref()
                .expect("consume mode implies a trailing option");
            trailing.add_occurrence(token.index, "", token.text, false)?;
            continue;
        }

        let (text, allow_long) = match token.kind {
            TokenKind::Bareword(word) => {
                positional_values.push((token.index, word.to_string()));
                if consume_after.is_some() && positional_values.len() >= required_demand {
                    consuming = true;
                }
                continue;
            }
            TokenKind::Long(text) => (text, true),
            TokenKind::Dash(text) => {
                if starts_with_digit(text.body) && !resolver::digit_head_is_option(&text, scope) {
                    // A negative number, not an option.
                    positional_values.push((token.index, token.text.to_string()));
                    if consume_after.is_some() && positional_values.len() >= required_demand {
                        consuming = true;
                    }
                    continue;
                }
                (text, !settings.long_options_use_double_dash)
            }
        };

        match resolver::resolve(&text, scope, allow_long) {
            Resolution::Exact {
                handle,
                matched,
                mut inline,
            } => {
                if handle.descriptor().formatting == Formatting::AlwaysPrefix {
                    if let Some(value) = inline.take() {
                        return Err(ParseError::UnexpectedValue {
                            name: matched,
                            value,
                        });
                    }
                }
                let value =
                    fetch_value(&handle, &matched, inline, &mut categorizer, scope, settings)?;
                if let Some(kind) = handle.descriptor().builtin {
                    // Value dumping waits for the walk to finish; help and
                    // version preempt it.
                    if let Builtin::PrintOptions { all } = kind {
                        print_options = Some(print_options.unwrap_or(false) || all);
                        continue;
                    }
                    return Ok(Outcome::Builtin(BuiltinRequest {
                        kind,
                        argument: (!value.is_empty()).then_some(value),
                    }));
                }
                dispatch_value(&handle, token.index, &matched, value, &mut categorizer)?;
            }
            Resolution::Prefix {
                handle,
                matched,
                value,
            } => {
                dispatch_value(&handle, token.index, &matched, value, &mut categorizer)?;
            }
            Resolution::Group { handles, inline } => {
                let last = handles.len() - 1;
                for (position, handle) in handles.iter().enumerate() {
                    let name = handle.descriptor().name.clone();
                    if position != last {
                        // Only the final member may take a value.
                        if handle.effective_value_expected() == ValueExpected::Required {
                            return Err(ParseError::GroupedValueHead { name });
                        }
                        handle.add_occurrence(token.index, &name, "", false)?;
                    } else {
                        let value = fetch_value(
                            handle,
                            &name,
                            inline.clone(),
                            &mut categorizer,
                            scope,
                            settings,
                        )?;
                        dispatch_value(handle, token.index, &name, value, &mut categorizer)?;
                    }
                }
            }
            Resolution::Unknown => {
                #[cfg(feature = "debug")]
                debug!(token = token.text, "no resolution for token");
                if active_eats_args(&positionals, positional_values.len()) {
                    // Swallowed by the open eats-args positional; buffered
                    // so distribution preserves argv order.
                    positional_values.push((token.index, token.text.to_string()));
                } else if !sinks.is_empty() {
                    for sink in &sinks {
                        sink.add_occurrence(token.index, "", token.text, false)?;
                    }
                } else {
                    return Err(ParseError::UnknownOption(token.text.to_string()));
                }
            }
        }
    }

    distribute_positionals(&positional_values, &positionals, &sinks)?;
    validator::validate(scope)?;
    Ok(Outcome::Success { print_options })
}

fn starts_with_digit(body: &str) -> bool {
    body.chars().next().is_some_and(|head| head.is_ascii_digit())
}

/// Determine the value for a matched option from its effective value
/// expectation: inline `=value` first, then the next argv entry where the
/// expectation allows it.
fn fetch_value(
    handle: &Arc<dyn OptionHandle>,
    matched: &str,
    inline: Option<String>,
    categorizer: &mut Categorizer<'_>,
    scope: &Scope,
    settings: &EngineSettings,
) -> Result<String, ParseError> {
    match handle.effective_value_expected() {
        ValueExpected::Required => match inline {
            Some(value) => Ok(value),
            // The next entry is the value, whatever it looks like.
            None => match categorizer.take_value() {
                Some((_, value)) => Ok(value.to_string()),
                None => Err(ParseError::MissingValue {
                    name: matched.to_string(),
                }),
            },
        },
        ValueExpected::Optional | ValueExpected::Unspecified => {
            if let Some(value) = inline {
                return Ok(value);
            }
            if let Some(peek) = categorizer.peek() {
                let consumable = handle.would_accept(peek)
                    && !resolves_as_option(peek, scope, settings, categorizer.raw_only());
                if consumable {
                    let (_, value) = categorizer
                        .take_value()
                        .expect("peeked value must be consumable");
                    return Ok(value.to_string());
                }
            }
            Ok(String::default())
        }
        ValueExpected::Disallowed => match inline {
            Some(value) => Err(ParseError::UnexpectedValue {
                name: matched.to_string(),
                value,
            }),
            None => Ok(String::default()),
        },
    }
}

/// Whether `raw`, seen as the lookahead for an optional value, would be
/// claimed by the option machinery instead.
fn resolves_as_option(
    raw: &str,
    scope: &Scope,
    settings: &EngineSettings,
    raw_mode: bool,
) -> bool {
    if raw_mode || raw == "-" || !raw.starts_with('-') {
        return false;
    }
    if raw == "--" {
        return true;
    }
    let (body, allow_long) = match raw.strip_prefix("--") {
        Some(body) => (body, true),
        None => (&raw[1..], !settings.long_options_use_double_dash),
    };
    let text = match body.split_once('=') {
        Some((name, value)) => OptText {
            body,
            name,
            value: Some(value),
        },
        None => OptText {
            body,
            name: body,
            value: None,
        },
    };
    !matches!(
        resolver::resolve(&text, scope, allow_long),
        Resolution::Unknown
    )
}

/// Deliver one fetched value: comma splitting, then the option's
/// additional consecutive values (which extend the occurrence rather than
/// count as new ones).
fn dispatch_value(
    handle: &Arc<dyn OptionHandle>,
    index: usize,
    matched: &str,
    value: String,
    categorizer: &mut Categorizer<'_>,
) -> Result<(), ParseError> {
    let descriptor = handle.descriptor();
    if descriptor.misc.comma_separated {
        for piece in value.split(',') {
            handle.add_occurrence(index, matched, piece, false)?;
        }
    } else {
        handle.add_occurrence(index, matched, &value, false)?;
    }

    for _ in 0..descriptor.additional_values {
        let (extra_index, extra) =
            categorizer
                .take_value()
                .ok_or_else(|| ParseError::MissingValue {
                    name: matched.to_string(),
                })?;
        handle.add_occurrence(extra_index, matched, extra, true)?;
    }
    Ok(())
}

/// Whether an eats-args positional is currently receiving values: it has
/// begun once the buffered bareword count exceeds the minimum demand of
/// the positionals declared before it.
fn active_eats_args(positionals: &[Arc<dyn OptionHandle>], buffered: usize) -> bool {
    let mut minimum_before = 0usize;
    for positional in positionals {
        let descriptor = positional.descriptor();
        if descriptor.misc.positional_eats_args && buffered > minimum_before {
            return true;
        }
        minimum_before += descriptor.occurrences.minimum() as usize;
    }
    false
}

/// Assign buffered barewords to positionals in declaration order:
/// single-valued positionals take one each; multi-valued ones take
/// everything not needed by the minimum demand of later positionals.
fn distribute_positionals(
    values: &[(usize, String)],
    positionals: &[Arc<dyn OptionHandle>],
    sinks: &[Arc<dyn OptionHandle>],
) -> Result<(), ParseError> {
    let mut cursor = 0usize;
    for (index, positional) in positionals.iter().enumerate() {
        let rest_minimum: usize = positionals[index + 1..]
            .iter()
            .map(|later| later.descriptor().occurrences.minimum() as usize)
            .sum();
        let available = values.len() - cursor;
        let take = match positional.descriptor().occurrences {
            Occurrences::Required | Occurrences::Optional => available.min(1),
            Occurrences::ZeroOrMore | Occurrences::OneOrMore => {
                available.saturating_sub(rest_minimum)
            }
            Occurrences::ConsumeAfter => 0,
        };
        for _ in 0..take {
            let (position, value) = &values[cursor];
            positional.add_occurrence(*position, "", value, false)?;
            cursor += 1;
        }
    }

    for (position, value) in &values[cursor..] {
        if sinks.is_empty() {
            return Err(ParseError::ExcessPositional(value.clone()));
        }
        for sink in sinks {
            sink.add_occurrence(*position, "", value, false)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{Opt, OptList};
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn run(tokens: &[&str], scope: &Scope) -> Result<Outcome, ParseError> {
        dispatch(tokens, scope, &EngineSettings::default())
    }

    #[test]
    fn scalar_and_flag() {
        let sub = SubCommand::detached("dispatch-scalar", "");
        let n = Opt::<i64>::build("n")
            .required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let v = Opt::<bool>::build("v").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        run(&["-n", "7", "-v"], &scope).unwrap();
        assert_eq!(n.value(), 7);
        assert!(v.value());
    }

    #[test]
    fn missing_required_is_reported_after_the_walk() {
        let sub = SubCommand::detached("dispatch-missing", "");
        Opt::<i64>::build("n")
            .required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let v = Opt::<bool>::build("v").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        let error = run(&["-v=false"], &scope).unwrap_err();
        assert_matches!(error, ParseError::MissingRequired { name } => assert_eq!(name, "n"));
        assert!(!v.value());
    }

    #[rstest]
    #[case(&["-v"], true)]
    #[case(&["-v=true"], true)]
    #[case(&["-v=false"], false)]
    #[case(&["-v", "FALSE"], false)]
    #[case(&["-v", "1"], true)]
    fn bool_value_forms(#[case] tokens: &[&str], #[case] expected: bool) {
        let sub = SubCommand::detached("dispatch-bool", "");
        let v = Opt::<bool>::build("v").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        run(tokens, &scope).unwrap();
        assert_eq!(v.value(), expected);
    }

    #[test]
    fn optional_value_does_not_eat_options_or_rejects() {
        let sub = SubCommand::detached("dispatch-optional", "");
        let v = Opt::<bool>::build("v").sub(&sub).try_register().unwrap();
        let q = Opt::<bool>::build("q").sub(&sub).try_register().unwrap();
        let file = Opt::<String>::positional("file").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        // '-q' resolves as an option: not consumed as the value of '-v'.
        // 'input.c' is not a valid bool: left for the positional.
        run(&["-v", "-q", "input.c"], &scope).unwrap();
        assert!(v.value());
        assert!(q.value());
        assert_eq!(file.value(), "input.c");
    }

    #[test]
    fn missing_value_for_required_expectation() {
        let sub = SubCommand::detached("dispatch-missing-value", "");
        Opt::<i64>::build("n").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        let error = run(&["-n"], &scope).unwrap_err();
        assert_matches!(error, ParseError::MissingValue { name } => assert_eq!(name, "n"));
    }

    #[test]
    fn required_value_consumes_dashed_token() {
        let sub = SubCommand::detached("dispatch-dashed-value", "");
        let n = Opt::<String>::build("n")
            .value_required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["-n", "-not-an-option"], &scope).unwrap();
        assert_eq!(n.value(), "-not-an-option");
    }

    #[test]
    fn unknown_option() {
        let sub = SubCommand::detached("dispatch-unknown", "");
        Opt::<bool>::build("v").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        let error = run(&["-moot"], &scope).unwrap_err();
        assert_eq!(error, ParseError::UnknownOption("-moot".to_string()));
    }

    #[test]
    fn comma_separated_list() {
        let sub = SubCommand::detached("dispatch-comma", "");
        let includes = OptList::<String>::build("I")
            .comma_separated()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["-I", "a,b", "-I", "c"], &scope).unwrap();
        assert_eq!(
            includes.values(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn additional_values_extend_one_occurrence() {
        let sub = SubCommand::detached("dispatch-multival", "");
        let pairs = OptList::<String>::build("D")
            .multi_val(1)
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["-D", "key", "value"], &scope).unwrap();
        assert_eq!(pairs.values(), vec!["key".to_string(), "value".to_string()]);
        assert_eq!(pairs.occurrences(), 1);

        let error = run(&["-D", "key"], &scope).unwrap_err();
        assert_matches!(error, ParseError::MissingValue { .. });
    }

    #[rstest]
    #[case(&["a.out", "--", "-x", "-y"])]
    #[case(&["a.out", "-x", "-y"])]
    fn consume_after(#[case] tokens: &[&str]) {
        let sub = SubCommand::detached("dispatch-consume", "");
        let file = Opt::<String>::positional("file")
            .required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let args = OptList::<String>::trailing("args")
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(tokens, &scope).unwrap();
        assert_eq!(file.value(), "a.out");
        assert_eq!(args.values(), vec!["-x".to_string(), "-y".to_string()]);
    }

    #[test]
    fn grouped_shorts_dispatch_in_order() {
        let sub = SubCommand::detached("dispatch-group", "");
        let mut flags = Vec::default();
        for name in ["l", "a", "h"] {
            flags.push(
                Opt::<bool>::build(name)
                    .grouping()
                    .sub(&sub)
                    .try_register()
                    .unwrap(),
            );
        }
        let scope = Scope::new(sub, None);

        run(&["-lah"], &scope).unwrap();
        for flag in &flags {
            assert!(flag.value());
        }
    }

    #[test]
    fn grouped_unknown_member() {
        let sub = SubCommand::detached("dispatch-group-unknown", "");
        for name in ["l", "a"] {
            Opt::<bool>::build(name)
                .grouping()
                .sub(&sub)
                .try_register()
                .unwrap();
        }
        let scope = Scope::new(sub, None);

        let error = run(&["-lz"], &scope).unwrap_err();
        assert_eq!(error, ParseError::UnknownOption("-lz".to_string()));
    }

    #[test]
    fn group_head_must_not_require_a_value() {
        let sub = SubCommand::detached("dispatch-group-head", "");
        Opt::<String>::build("o")
            .grouping()
            .value_required()
            .sub(&sub)
            .try_register()
            .unwrap();
        Opt::<bool>::build("v")
            .grouping()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        let error = run(&["-ov"], &scope).unwrap_err();
        assert_matches!(error, ParseError::GroupedValueHead { name } => assert_eq!(name, "o"));
    }

    #[test]
    fn group_tail_may_take_a_value() {
        let sub = SubCommand::detached("dispatch-group-tail", "");
        let v = Opt::<bool>::build("v")
            .grouping()
            .sub(&sub)
            .try_register()
            .unwrap();
        let o = Opt::<String>::build("o")
            .grouping()
            .value_required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["-vo", "out.bin"], &scope).unwrap();
        assert!(v.value());
        assert_eq!(o.value(), "out.bin");
    }

    #[test]
    fn prefix_value_in_suffix() {
        let sub = SubCommand::detached("dispatch-prefix", "");
        let lib = OptList::<String>::build("L")
            .prefix()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["-L/usr/lib", "-L/opt/lib"], &scope).unwrap();
        assert_eq!(
            lib.values(),
            vec!["/usr/lib".to_string(), "/opt/lib".to_string()]
        );
    }

    #[test]
    fn always_prefix_rejects_equals_form() {
        let sub = SubCommand::detached("dispatch-always-prefix", "");
        let lib = Opt::<String>::build("L")
            .always_prefix()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["-L/usr/lib"], &scope).unwrap();
        assert_eq!(lib.value(), "/usr/lib");

        let error = run(&["-L=/usr/lib"], &scope).unwrap_err();
        assert_matches!(error, ParseError::UnexpectedValue { name, value } => {
            assert_eq!(name, "L");
            assert_eq!(value, "/usr/lib");
        });
    }

    #[test]
    fn sink_receives_everything_unclaimed() {
        let sub = SubCommand::detached("dispatch-sink", "");
        let v = Opt::<bool>::build("v").sub(&sub).try_register().unwrap();
        let rest = OptList::<String>::sink("rest")
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["-unknown", "-v", "stray"], &scope).unwrap();
        assert!(v.value());
        assert_eq!(
            rest.values(),
            vec!["-unknown".to_string(), "stray".to_string()]
        );
    }

    #[test]
    fn eats_args_swallows_option_like_tokens() {
        let sub = SubCommand::detached("dispatch-eats", "");
        let argv = OptList::<String>::positional("argv")
            .one_or_more()
            .positional_eats_args()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["script.py", "-x", "file", "-y"], &scope).unwrap();
        assert_eq!(
            argv.values(),
            vec![
                "script.py".to_string(),
                "-x".to_string(),
                "file".to_string(),
                "-y".to_string(),
            ]
        );
    }

    #[test]
    fn negative_number_is_positional() {
        let sub = SubCommand::detached("dispatch-negative", "");
        let n = Opt::<i64>::positional("n").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        run(&["-5"], &scope).unwrap();
        assert_eq!(n.value(), -5);
    }

    #[test]
    fn excess_positionals_error_without_a_sink() {
        let sub = SubCommand::detached("dispatch-excess", "");
        Opt::<String>::positional("file").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        let error = run(&["one", "two"], &scope).unwrap_err();
        assert_eq!(error, ParseError::ExcessPositional("two".to_string()));
    }

    #[test]
    fn positional_distribution_respects_later_demand() {
        let sub = SubCommand::detached("dispatch-distribute", "");
        let first = OptList::<String>::positional("first")
            .one_or_more()
            .sub(&sub)
            .try_register()
            .unwrap();
        let second = Opt::<String>::positional("second")
            .required()
            .sub(&sub)
            .try_register()
            .unwrap();
        let scope = Scope::new(sub, None);

        run(&["a", "b", "c"], &scope).unwrap();
        assert_eq!(first.values(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(second.value(), "c");
    }

    #[test]
    fn duplicate_occurrence_of_single_option() {
        let sub = SubCommand::detached("dispatch-duplicate", "");
        Opt::<i64>::build("n").sub(&sub).try_register().unwrap();
        let scope = Scope::new(sub, None);

        let error = run(&["-n", "1", "-n", "2"], &scope).unwrap_err();
        assert_matches!(error, ParseError::DuplicateOccurrence { name } => assert_eq!(name, "n"));
    }

    #[test]
    fn select_sub_commands() {
        let build = SubCommand::detached("build", "build things");
        let test = SubCommand::detached("test", "test things");
        let subs = vec![build.clone(), test.clone()];

        let (chosen, skip) = select_sub_command(&["build", "-v"], &subs).unwrap();
        assert!(chosen == build);
        assert_eq!(skip, 1);

        assert!(select_sub_command(&["-v"], &subs).is_none());
        assert!(select_sub_command(&["deploy"], &subs).is_none());
        assert!(select_sub_command(&[], &subs).is_none());
    }
}
