//! Resolves classified tokens against the active scope.

use std::sync::Arc;

use crate::engine::categorizer::OptText;
use crate::model::{Formatting, ValueExpected};
use crate::option::OptionHandle;
use crate::registry::SubCommand;

#[cfg(feature = "debug")]
use tracing::debug;

/// The option surfaces visible to one parse: the active subcommand plus
/// the `all` sentinel scope.
pub(crate) struct Scope {
    sub: SubCommand,
    all: Option<SubCommand>,
}

impl Scope {
    pub(crate) fn new(sub: SubCommand, all: Option<SubCommand>) -> Self {
        Self { sub, all }
    }

    /// Name lookup; `all`-scoped options lose to the subcommand's own.
    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<dyn OptionHandle>> {
        self.sub
            .lookup(name)
            .or_else(|| self.all.as_ref().and_then(|all| all.lookup(name)))
    }

    /// Every visible option, registration order, subcommand's first.
    pub(crate) fn options(&self) -> Vec<Arc<dyn OptionHandle>> {
        let mut options = self.sub.in_order();
        if let Some(all) = &self.all {
            options.extend(all.in_order());
        }
        options
    }

    pub(crate) fn positionals(&self) -> Vec<Arc<dyn OptionHandle>> {
        let mut positionals = self.sub.positionals();
        if let Some(all) = &self.all {
            positionals.extend(all.positionals());
        }
        positionals
    }

    pub(crate) fn sinks(&self) -> Vec<Arc<dyn OptionHandle>> {
        let mut sinks = self.sub.sinks();
        if let Some(all) = &self.all {
            sinks.extend(all.sinks());
        }
        sinks
    }

    pub(crate) fn consume_after(&self) -> Option<Arc<dyn OptionHandle>> {
        self.sub
            .consume_after()
            .or_else(|| self.all.as_ref().and_then(|all| all.consume_after()))
    }
}

pub(crate) enum Resolution {
    /// A `by_name` hit; an inline `=value` may accompany it.
    Exact {
        handle: Arc<dyn OptionHandle>,
        matched: String,
        inline: Option<String>,
    },
    /// A prefix-formatted option whose name heads the token; the suffix
    /// carries the value.
    Prefix {
        handle: Arc<dyn OptionHandle>,
        matched: String,
        value: String,
    },
    /// A run of single-char grouping options; only the last may take the
    /// inline value.
    Group {
        handles: Vec<Arc<dyn OptionHandle>>,
        inline: Option<String>,
    },
    Unknown,
}

/// Resolve an option-shaped token. `allow_long` is false for single-dash
/// tokens when long options demand a double dash; exact matching is then
/// limited to single-char names.
pub(crate) fn resolve(text: &OptText<'_>, scope: &Scope, allow_long: bool) -> Resolution {
    let single_char = text.name.chars().count() == 1;
    if !text.name.is_empty() && (allow_long || single_char) {
        if let Some(handle) = scope.lookup(text.name) {
            #[cfg(feature = "debug")]
            debug!(name = text.name, "exact option match");
            return Resolution::Exact {
                handle,
                matched: text.name.to_string(),
                inline: text.value.map(str::to_string),
            };
        }
    }

    // Longest registered prefix wins; registration order breaks ties.
    if let Some((length, handle)) = longest_prefix(scope, text.body) {
        #[cfg(feature = "debug")]
        debug!(name = &text.body[..length], "prefix option match");
        return Resolution::Prefix {
            handle,
            matched: text.body[..length].to_string(),
            value: text.body[length..].to_string(),
        };
    }

    if let Some(handles) = grouped(text, scope) {
        return Resolution::Group {
            handles,
            inline: text.value.map(str::to_string),
        };
    }

    Resolution::Unknown
}

fn longest_prefix(scope: &Scope, body: &str) -> Option<(usize, Arc<dyn OptionHandle>)> {
    let mut best: Option<(usize, Arc<dyn OptionHandle>)> = None;
    for handle in scope.options() {
        let descriptor = handle.descriptor();
        if !matches!(
            descriptor.formatting,
            Formatting::Prefix | Formatting::AlwaysPrefix
        ) {
            continue;
        }
        let name = &descriptor.name;
        if name.is_empty() || !body.starts_with(name.as_str()) || body.len() <= name.len() {
            continue;
        }
        let longer = best
            .as_ref()
            .map_or(true, |(length, _)| name.len() > *length);
        if longer {
            best = Some((name.len(), handle));
        }
    }
    best
}

/// Every character must name a distinct grouping option.
fn grouped(text: &OptText<'_>, scope: &Scope) -> Option<Vec<Arc<dyn OptionHandle>>> {
    if text.name.is_empty() {
        return None;
    }
    let mut handles = Vec::default();
    for single in text.name.chars() {
        let handle = scope.lookup(single.to_string().as_str())?;
        if !handle.descriptor().misc.grouping {
            return None;
        }
        handles.push(handle);
    }
    Some(handles)
}

/// A leading dash followed by a digit is an option only when a
/// single-char option exists that expects a value.
pub(crate) fn digit_head_is_option(text: &OptText<'_>, scope: &Scope) -> bool {
    let head = match text.body.chars().next() {
        Some(head) if head.is_ascii_digit() => head,
        _ => return false,
    };
    scope
        .lookup(head.to_string().as_str())
        .map_or(false, |handle| {
            handle.effective_value_expected() == ValueExpected::Required
        })
}
