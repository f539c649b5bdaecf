//! The parse entry points.

use crate::engine::dispatcher::{self, BuiltinRequest, EngineSettings, Outcome};
use crate::engine::resolver::Scope;
use crate::interface::{ConsoleInterface, UserInterface};
use crate::option::Builtin;
use crate::printer::{self, HelpRequest};
use crate::registry::{self, SubCommand};

/// Configuration for one parse.
pub struct ParseSettings {
    program: String,
    overview: Option<String>,
    env_var: Option<String>,
    long_options_use_double_dash: bool,
    expand: Option<fn(Vec<String>) -> Vec<String>>,
}

impl ParseSettings {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            overview: None,
            env_var: None,
            long_options_use_double_dash: false,
            expand: None,
        }
    }

    /// Overview text shown at the top of the help message.
    pub fn overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    /// Tokenize this environment variable's value and prepend it to argv,
    /// so argv occurrences take precedence for later-wins options.
    pub fn env_var(mut self, variable: impl Into<String>) -> Self {
        self.env_var = Some(variable.into());
        self
    }

    /// Reject single-dash long options: only `--name` and `--name=value`
    /// are long forms, and `-x` is always short or grouped.
    pub fn long_options_use_double_dash(mut self, yes: bool) -> Self {
        self.long_options_use_double_dash = yes;
        self
    }

    /// Install a pre-pass over argv (e.g. response-file expansion); the
    /// parser only ever sees its output.
    pub fn expand(mut self, expand: fn(Vec<String>) -> Vec<String>) -> Self {
        self.expand = Some(expand);
        self
    }
}

/// Parse `tokens` (argv without the program name) against the global
/// registry, reporting through `interface`.
///
/// Returns `Err(1)` on a parse failure and `Err(0)` after a built-in
/// (`-help`, `-version`, ...) printed its output.
pub fn try_parse_command_line_options(
    tokens: &[&str],
    settings: &ParseSettings,
    interface: &dyn UserInterface,
) -> Result<(), i32> {
    let mut owned: Vec<String> = Vec::default();
    if let Some(variable) = &settings.env_var {
        if let Ok(value) = std::env::var(variable) {
            owned.extend(value.split_whitespace().map(str::to_string));
        }
    }
    owned.extend(tokens.iter().map(|token| token.to_string()));
    if let Some(expand) = settings.expand {
        owned = expand(owned);
    }
    let tokens: Vec<&str> = owned.iter().map(AsRef::as_ref).collect();

    let sub_commands = registry::user_sub_commands();
    let top_level = SubCommand::top_level();
    top_level.set_selected(false);
    for sub in &sub_commands {
        sub.set_selected(false);
    }

    let (active, skip) = match dispatcher::select_sub_command(&tokens, &sub_commands) {
        Some((sub, skip)) => (sub, skip),
        None => (top_level, 0),
    };
    active.set_selected(true);

    let scope = Scope::new(active.clone(), Some(SubCommand::all()));
    let engine = EngineSettings {
        long_options_use_double_dash: settings.long_options_use_double_dash,
    };

    match dispatcher::dispatch(&tokens[skip..], &scope, &engine) {
        Ok(Outcome::Success { print_options }) => {
            if let Some(all) = print_options {
                let message = printer::print_options_message(&scope, all);
                if !message.is_empty() {
                    interface.print(message);
                }
            }
            Ok(())
        }
        Ok(Outcome::Builtin(request)) => {
            render_builtin(&request, &scope, &active, settings, interface);
            Err(0)
        }
        Err(error) => {
            interface.print_error(&error);
            Err(1)
        }
    }
}

/// Parse the process arguments in terminating mode: diagnostics go to
/// stderr and any failure (or built-in) exits the process.
pub fn parse_command_line_options(settings: &ParseSettings) {
    let owned: Vec<String> = std::env::args().skip(1).collect();
    let tokens: Vec<&str> = owned.iter().map(AsRef::as_ref).collect();
    let interface = ConsoleInterface::new(settings.program.clone());
    if let Err(code) = try_parse_command_line_options(&tokens, settings, &interface) {
        std::process::exit(code);
    }
}

/// Print the top-level help message exactly as `-help` (or, with
/// `hidden`, `-help-hidden`) would.
pub fn print_help_message(program: &str, hidden: bool) {
    let scope = Scope::new(SubCommand::top_level(), Some(SubCommand::all()));
    let request = HelpRequest {
        program,
        overview: None,
        hidden,
        list: false,
        category_filter: None,
    };
    let interface = ConsoleInterface::default();
    interface.print(printer::help_message(
        &request,
        &scope,
        &registry::user_sub_commands(),
    ));
}

/// Print the version message exactly as `-version` would.
pub fn print_version_message() {
    ConsoleInterface::default().print(printer::version_message());
}

fn render_builtin(
    request: &BuiltinRequest,
    scope: &Scope,
    active: &SubCommand,
    settings: &ParseSettings,
    interface: &dyn UserInterface,
) {
    match request.kind {
        Builtin::Help { hidden, list } => {
            let in_sub = !active.name().is_empty();
            let program = if in_sub {
                format!(
                    "{program} {sub}",
                    program = settings.program,
                    sub = active.name()
                )
            } else {
                settings.program.clone()
            };
            // Subcommand listings only make sense at the top level.
            let sub_commands = if in_sub {
                Vec::default()
            } else {
                registry::user_sub_commands()
            };
            let help = HelpRequest {
                program: &program,
                overview: settings.overview.as_deref(),
                hidden,
                list,
                category_filter: request.argument.as_deref(),
            };
            interface.print(printer::help_message(&help, scope, &sub_commands));
        }
        Builtin::Version => interface.print(printer::version_message()),
        Builtin::PrintOptions { all } => {
            interface.print(printer::print_options_message(scope, all));
        }
    }
}
