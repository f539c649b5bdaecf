//! Renders help, version, and option-value listings.
//!
//! Presentation only: nothing here affects parsing. Options appear in
//! registration order, grouped by category unless a flat list was asked
//! for.

use std::sync::Arc;

use terminal_size::{terminal_size, Width};

use crate::engine::resolver::Scope;
use crate::model::{Hidden, Occurrences, ValueExpected};
use crate::option::OptionHandle;
use crate::registry::{self, SubCommand};

const FALLBACK_WIDTH: usize = 80;
const MINIMUM_HELP_WIDTH: usize = 20;

fn output_width() -> usize {
    match terminal_size() {
        Some((Width(width), _)) => width as usize,
        None => FALLBACK_WIDTH,
    }
}

/// Greedy word wrap with a hard break for words longer than `width`.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::default();
    let mut current = String::default();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let (head, tail) = word.split_at(width);
            lines.push(head.to_string());
            word = tail;
        }
        if current.is_empty() {
            current.push_str(word);
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) struct HelpRequest<'a> {
    pub program: &'a str,
    pub overview: Option<&'a str>,
    pub hidden: bool,
    pub list: bool,
    pub category_filter: Option<&'a str>,
}

/// One rendered help row: the tag column plus its description.
struct Row {
    tag: String,
    help: String,
}

fn visible(handle: &Arc<dyn OptionHandle>, hidden: bool) -> bool {
    match handle.descriptor().hidden() {
        Hidden::Visible => true,
        Hidden::Hidden => hidden,
        Hidden::ReallyHidden => false,
    }
}

fn category_names(handle: &Arc<dyn OptionHandle>) -> Vec<String> {
    let categories = &handle.descriptor().categories;
    if categories.is_empty() {
        vec!["General".to_string()]
    } else {
        categories.iter().map(|c| c.name().to_string()).collect()
    }
}

/// Rows for one option: its own line, plus one per literal value.
fn rows(handle: &Arc<dyn OptionHandle>) -> Vec<Row> {
    let descriptor = handle.descriptor();
    let mut out = Vec::default();

    if descriptor.name.is_empty() {
        // The mapping table is the naming surface.
        for (literal, help) in handle.literal_help() {
            out.push(Row {
                tag: format!("-{literal}"),
                help,
            });
        }
        return out;
    }

    let placeholder = handle.value_placeholder();
    let suffix = match (handle.effective_value_expected(), placeholder) {
        (ValueExpected::Required, Some(placeholder)) => format!("=<{placeholder}>"),
        (ValueExpected::Optional, Some(placeholder)) => format!("[=<{placeholder}>]"),
        _ => String::default(),
    };
    out.push(Row {
        tag: format!("-{name}{suffix}", name = descriptor.name),
        help: descriptor.help.clone(),
    });
    for (literal, help) in handle.literal_help() {
        out.push(Row {
            tag: format!("  ={literal}"),
            help,
        });
    }
    out
}

fn usage_line(program: &str, scope: &Scope, has_sub_commands: bool) -> String {
    let mut usage = format!("USAGE: {program}");
    if has_sub_commands {
        usage.push_str(" [subcommand]");
    }
    usage.push_str(" [options]");
    for positional in scope.positionals() {
        let placeholder = positional
            .value_placeholder()
            .unwrap_or_else(|| "arg".to_string());
        let piece = match positional.descriptor().occurrences {
            Occurrences::Required => format!(" <{placeholder}>"),
            Occurrences::OneOrMore => format!(" <{placeholder}>..."),
            Occurrences::ZeroOrMore => format!(" [<{placeholder}>...]"),
            _ => format!(" [<{placeholder}>]"),
        };
        usage.push_str(&piece);
    }
    if let Some(trailing) = scope.consume_after() {
        let placeholder = trailing
            .value_placeholder()
            .unwrap_or_else(|| "args".to_string());
        usage.push_str(&format!(" <{placeholder}>..."));
    }
    usage
}

pub(crate) fn help_message(
    request: &HelpRequest<'_>,
    scope: &Scope,
    sub_commands: &[SubCommand],
) -> String {
    let width = output_width().max(MINIMUM_HELP_WIDTH);
    let mut lines: Vec<String> = Vec::default();

    if let Some(overview) = request.overview {
        lines.push("OVERVIEW:".to_string());
        for line in wrap(overview, width.saturating_sub(2)) {
            lines.push(format!("  {line}"));
        }
        lines.push(String::default());
    }

    lines.push(usage_line(request.program, scope, !sub_commands.is_empty()));
    lines.push(String::default());

    if !sub_commands.is_empty() {
        lines.push("SUBCOMMANDS:".to_string());
        for sub in sub_commands {
            if sub.description().is_empty() {
                lines.push(format!("  {name}", name = sub.name()));
            } else {
                lines.push(format!(
                    "  {name} - {description}",
                    name = sub.name(),
                    description = sub.description()
                ));
            }
        }
        lines.push(String::default());
    }

    // Collect (category, rows) for every visible named surface.
    let mut sections: Vec<(String, Vec<Row>)> = Vec::default();
    let mut push_rows = |category: String, option_rows: Vec<Row>| {
        if option_rows.is_empty() {
            return;
        }
        match sections.iter_mut().find(|(name, _)| *name == category) {
            Some((_, existing)) => existing.extend(option_rows),
            None => sections.push((category, option_rows)),
        }
    };

    for handle in scope.options() {
        let descriptor = handle.descriptor();
        if descriptor.is_positional()
            || descriptor.misc.sink
            || descriptor.occurrences == Occurrences::ConsumeAfter
        {
            continue;
        }
        if !visible(&handle, request.hidden) {
            continue;
        }
        let categories = category_names(&handle);
        if let Some(filter) = request.category_filter {
            if !categories.iter().any(|name| name == filter) {
                continue;
            }
        }
        if request.list {
            push_rows(String::default(), rows(&handle));
        } else {
            // The first category owns the entry.
            push_rows(categories[0].clone(), rows(&handle));
        }
    }

    lines.push("OPTIONS:".to_string());
    let tag_width = sections
        .iter()
        .flat_map(|(_, rows)| rows.iter())
        .map(|row| row.tag.len())
        .max()
        .unwrap_or(0);
    let help_width = width.saturating_sub(tag_width + 6).max(MINIMUM_HELP_WIDTH);

    for (category, rows) in &sections {
        if !request.list {
            lines.push(String::default());
            lines.push(format!("{category}:"));
        }
        for row in rows {
            if row.help.is_empty() {
                lines.push(format!("  {tag}", tag = row.tag));
                continue;
            }
            let wrapped = wrap(&row.help, help_width);
            for (index, piece) in wrapped.iter().enumerate() {
                if index == 0 {
                    lines.push(format!("  {tag:tag_width$} - {piece}", tag = row.tag));
                } else {
                    lines.push(format!("  {blank:tag_width$}   {piece}", blank = ""));
                }
            }
        }
    }

    for paragraph in registry::extra_help_text() {
        lines.push(String::default());
        lines.push(paragraph);
    }

    lines.join("\n")
}

pub(crate) fn version_message() -> String {
    let (main, extras) = registry::version_printers();
    let mut parts = vec![main.map(|printer| printer()).unwrap_or_else(|| {
        format!(
            "declopt command line parser, version {version}",
            version = env!("CARGO_PKG_VERSION")
        )
    })];
    parts.extend(extras.into_iter().map(|printer| printer()));
    parts.join("\n")
}

/// Lines for `-print-options` / `-print-all-options`.
pub(crate) fn print_options_message(scope: &Scope, all: bool) -> String {
    let mut lines = Vec::default();
    for handle in scope.options() {
        if let Some((line, differs)) = handle.value_summary() {
            if all || differs {
                lines.push(line);
            }
        }
    }
    lines.join("\n")
}
