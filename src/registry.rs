//! Categories, subcommands, and the process-global registry.
//!
//! Each subcommand owns its own registry (name map, positional list, sink
//! list, consume-after slot). Two distinguished scopes exist: the top
//! level, used when argv carries no subcommand prefix, and the `all`
//! sentinel, whose options are visible from every scope. Options listing
//! `all` are registered there once; lookup resolves the membership instead
//! of copying entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::ConfigError;
use crate::model::{Hidden, Occurrences, ValueExpected};
use crate::option::{Builtin, OptionHandle};

/// A display grouping label; attaching one never affects parsing.
#[derive(Clone)]
pub struct Category {
    core: Arc<CategoryCore>,
}

struct CategoryCore {
    name: String,
    description: String,
}

impl Category {
    /// Register a category, or return the existing handle for the name.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let mut globals = globals().lock().unwrap();
        if let Some(existing) = globals.categories.iter().find(|c| c.name() == name) {
            return existing.clone();
        }
        let category = Category {
            core: Arc::new(CategoryCore {
                name,
                description: description.into(),
            }),
        };
        globals.categories.push(category.clone());
        category
    }

    /// The default category options fall into.
    pub fn general() -> Self {
        globals().lock().unwrap().general.clone()
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn description(&self) -> &str {
        &self.core.description
    }

    fn detached(name: &str, description: &str) -> Self {
        Category {
            core: Arc::new(CategoryCore {
                name: name.to_string(),
                description: description.to_string(),
            }),
        }
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

/// A named scope with its own registry.
#[derive(Clone)]
pub struct SubCommand {
    core: Arc<SubCommandCore>,
}

struct SubCommandCore {
    name: String,
    description: String,
    selected: AtomicBool,
    registry: Mutex<SubRegistry>,
}

#[derive(Default)]
struct SubRegistry {
    by_name: HashMap<String, Arc<dyn OptionHandle>>,
    positionals: Vec<Arc<dyn OptionHandle>>,
    sinks: Vec<Arc<dyn OptionHandle>>,
    consume_after: Option<Arc<dyn OptionHandle>>,
    order: Vec<Arc<dyn OptionHandle>>,
}

impl SubCommand {
    /// Register a subcommand, or return the existing handle for the name.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let mut globals = globals().lock().unwrap();
        if let Some(existing) = globals.subs.iter().find(|s| s.name() == name) {
            return existing.clone();
        }
        let sub = Self::detached(&name, &description.into());
        globals.subs.push(sub.clone());
        sub
    }

    /// The scope used when argv carries no subcommand prefix.
    pub fn top_level() -> Self {
        globals().lock().unwrap().top_level.clone()
    }

    /// The sentinel scope whose options appear in every subcommand.
    pub fn all() -> Self {
        globals().lock().unwrap().all.clone()
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn description(&self) -> &str {
        &self.core.description
    }

    /// True iff this subcommand was chosen by the current parse.
    pub fn selected(&self) -> bool {
        self.core.selected.load(Ordering::Relaxed)
    }

    pub(crate) fn set_selected(&self, selected: bool) {
        self.core.selected.store(selected, Ordering::Relaxed);
    }

    pub(crate) fn detached(name: &str, description: &str) -> Self {
        SubCommand {
            core: Arc::new(SubCommandCore {
                name: name.to_string(),
                description: description.to_string(),
                selected: AtomicBool::new(false),
                registry: Mutex::new(SubRegistry::default()),
            }),
        }
    }

    pub(crate) fn register_handle(
        &self,
        handle: Arc<dyn OptionHandle>,
    ) -> Result<(), ConfigError> {
        let mut registry = self.core.registry.lock().unwrap();
        let descriptor = handle.descriptor();

        if descriptor.occurrences == Occurrences::ConsumeAfter {
            if registry.consume_after.is_some() {
                return Err(ConfigError::SecondConsumeAfter);
            }
            registry.consume_after = Some(Arc::clone(&handle));
        } else if descriptor.misc.sink {
            registry.sinks.push(Arc::clone(&handle));
        } else if descriptor.is_positional() {
            registry.positionals.push(Arc::clone(&handle));
        } else if descriptor.name.is_empty() {
            // The mapping table is the naming surface.
            for literal in handle.literal_names() {
                registry.insert_named(literal, Arc::clone(&handle))?;
            }
        } else {
            registry.insert_named(descriptor.name.clone(), Arc::clone(&handle))?;
        }

        registry.order.push(handle);
        Ok(())
    }

    /// Remove `handle`, which must be the most recently registered option
    /// in this scope. A testing affordance.
    pub(crate) fn unregister_last(
        &self,
        handle: &Arc<dyn OptionHandle>,
    ) -> Result<(), ConfigError> {
        let mut registry = self.core.registry.lock().unwrap();
        match registry.order.last() {
            Some(last) if Arc::ptr_eq(last, handle) => {}
            _ => {
                return Err(ConfigError::UnregisterOrder(
                    handle.descriptor().display_name(),
                ))
            }
        }
        registry.order.pop();

        let descriptor = handle.descriptor();
        if descriptor.occurrences == Occurrences::ConsumeAfter {
            registry.consume_after = None;
        } else if descriptor.misc.sink {
            registry.sinks.pop();
        } else if descriptor.is_positional() {
            registry.positionals.pop();
        } else if descriptor.name.is_empty() {
            for literal in handle.literal_names() {
                registry.by_name.remove(&literal);
            }
        } else {
            registry.by_name.remove(&descriptor.name);
        }
        Ok(())
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<dyn OptionHandle>> {
        self.core
            .registry
            .lock()
            .unwrap()
            .by_name
            .get(name)
            .cloned()
    }

    pub(crate) fn positionals(&self) -> Vec<Arc<dyn OptionHandle>> {
        self.core.registry.lock().unwrap().positionals.clone()
    }

    pub(crate) fn sinks(&self) -> Vec<Arc<dyn OptionHandle>> {
        self.core.registry.lock().unwrap().sinks.clone()
    }

    pub(crate) fn consume_after(&self) -> Option<Arc<dyn OptionHandle>> {
        self.core.registry.lock().unwrap().consume_after.clone()
    }

    /// Registered options in registration order.
    pub(crate) fn in_order(&self) -> Vec<Arc<dyn OptionHandle>> {
        self.core.registry.lock().unwrap().order.clone()
    }
}

impl PartialEq for SubCommand {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl SubRegistry {
    fn insert_named(
        &mut self,
        name: String,
        handle: Arc<dyn OptionHandle>,
    ) -> Result<(), ConfigError> {
        if let Some(existing) = self.by_name.get(&name) {
            // Built-in style defaults yield to a real registration.
            if !existing.descriptor().misc.default_option {
                return Err(ConfigError::DuplicateOption(name));
            }
            let stale = Arc::clone(existing);
            self.order.retain(|entry| !Arc::ptr_eq(entry, &stale));
        }
        self.by_name.insert(name, handle);
        Ok(())
    }
}

/// Register an option into every scope its descriptor lists (the top
/// level when none are listed).
pub(crate) fn register_option(handle: Arc<dyn OptionHandle>) -> Result<(), ConfigError> {
    let subs = handle.descriptor().subs.clone();
    if subs.is_empty() {
        SubCommand::top_level().register_handle(handle)
    } else {
        for sub in &subs {
            sub.register_handle(Arc::clone(&handle))?;
        }
        Ok(())
    }
}

/// Unregister an option from every scope it was registered into.
pub(crate) fn unregister_option(handle: &Arc<dyn OptionHandle>) -> Result<(), ConfigError> {
    let subs = handle.descriptor().subs.clone();
    if subs.is_empty() {
        SubCommand::top_level().unregister_last(handle)
    } else {
        for sub in subs.iter().rev() {
            sub.unregister_last(handle)?;
        }
        Ok(())
    }
}

/// Renders one version message paragraph.
pub type VersionPrinter = fn() -> String;

struct Globals {
    top_level: SubCommand,
    all: SubCommand,
    subs: Vec<SubCommand>,
    categories: Vec<Category>,
    general: Category,
    extra_help: Vec<String>,
    version_printer: Option<VersionPrinter>,
    extra_version_printers: Vec<VersionPrinter>,
}

impl Globals {
    fn fresh() -> Self {
        let general = Category::detached("General", "General options");
        let globals = Globals {
            top_level: SubCommand::detached("", ""),
            all: SubCommand::detached("", ""),
            subs: Vec::default(),
            categories: vec![general.clone()],
            general,
            extra_help: Vec::default(),
            version_printer: None,
            extra_version_printers: Vec::default(),
        };
        globals.register_builtins();
        globals
    }

    fn register_builtins(&self) {
        use crate::option::{builtin_alias, builtin_flag};

        let register = |handle: Arc<dyn OptionHandle>| {
            self.all
                .register_handle(handle)
                .expect("built-in registration into a fresh scope cannot collide");
        };

        let help = builtin_flag(
            "help",
            "display available options (use '-help-hidden' for more)",
            ValueExpected::Optional,
            Hidden::Visible,
            Builtin::Help {
                hidden: false,
                list: false,
            },
        );
        register(Arc::clone(&help));
        register(builtin_alias("h", help));
        register(builtin_flag(
            "help-hidden",
            "display all available options",
            ValueExpected::Optional,
            Hidden::Hidden,
            Builtin::Help {
                hidden: true,
                list: false,
            },
        ));
        register(builtin_flag(
            "help-list",
            "display list of available options (use '-help-list-hidden' for more)",
            ValueExpected::Disallowed,
            Hidden::Hidden,
            Builtin::Help {
                hidden: false,
                list: true,
            },
        ));
        register(builtin_flag(
            "help-list-hidden",
            "display list of all available options",
            ValueExpected::Disallowed,
            Hidden::Hidden,
            Builtin::Help {
                hidden: true,
                list: true,
            },
        ));
        register(builtin_flag(
            "version",
            "display the version of this program",
            ValueExpected::Disallowed,
            Hidden::Visible,
            Builtin::Version,
        ));
        register(builtin_flag(
            "print-options",
            "print non-default options after command line parsing",
            ValueExpected::Disallowed,
            Hidden::Hidden,
            Builtin::PrintOptions { all: false },
        ));
        register(builtin_flag(
            "print-all-options",
            "print all option values after command line parsing",
            ValueExpected::Disallowed,
            Hidden::Hidden,
            Builtin::PrintOptions { all: true },
        ));
    }
}

static GLOBALS: OnceLock<Mutex<Globals>> = OnceLock::new();

fn globals() -> &'static Mutex<Globals> {
    GLOBALS.get_or_init(|| Mutex::new(Globals::fresh()))
}

/// Every scope holding options, in a stable order.
fn scopes() -> Vec<SubCommand> {
    let globals = globals().lock().unwrap();
    let mut scopes = vec![globals.top_level.clone(), globals.all.clone()];
    scopes.extend(globals.subs.iter().cloned());
    scopes
}

/// Return every registered option to its declared default and clear
/// occurrence counters, without affecting registration.
pub fn reset_all_option_occurrences() {
    for scope in scopes() {
        for handle in scope.in_order() {
            handle.reset();
        }
        scope.set_selected(false);
    }
}

/// Reset the parser to an empty world: all user options, categories,
/// subcommands, extra help, and version printers are discarded. The fresh
/// world re-creates the distinguished scopes and the built-in options.
pub fn reset_command_line_parser() {
    *globals().lock().unwrap() = Globals::fresh();
}

/// Names registered in `sub` (the `all` scope is not consulted).
pub fn registered_option_names(sub: &SubCommand) -> Vec<String> {
    let registry = sub.core.registry.lock().unwrap();
    let mut names: Vec<String> = registry.by_name.keys().cloned().collect();
    names.sort();
    names
}

/// The top level plus every user-registered subcommand.
pub fn registered_sub_commands() -> Vec<SubCommand> {
    let globals = globals().lock().unwrap();
    let mut subs = vec![globals.top_level.clone()];
    subs.extend(globals.subs.iter().cloned());
    subs
}

/// Mark every option of `sub` (and the `all` scope) outside `categories`
/// as really hidden. Built-ins keep their visibility.
pub fn hide_unrelated_options(categories: &[&Category], sub: &SubCommand) {
    for scope in [sub.clone(), SubCommand::all()] {
        for handle in scope.in_order() {
            let descriptor = handle.descriptor();
            if descriptor.builtin.is_some() {
                continue;
            }
            let related = descriptor
                .categories
                .iter()
                .any(|category| categories.iter().any(|keep| *keep == category));
            if !related {
                descriptor.set_hidden(Hidden::ReallyHidden);
            }
        }
    }
}

/// Install a replacement for the default `-version` message.
pub fn set_version_printer(printer: VersionPrinter) {
    globals().lock().unwrap().version_printer = Some(printer);
}

/// Add a printer run after the main version message.
pub fn add_extra_version_printer(printer: VersionPrinter) {
    globals()
        .lock()
        .unwrap()
        .extra_version_printers
        .push(printer);
}

/// Accumulate a paragraph printed at the end of the help message.
pub fn add_extra_help(text: impl Into<String>) {
    globals().lock().unwrap().extra_help.push(text.into());
}

pub(crate) fn version_printers() -> (Option<VersionPrinter>, Vec<VersionPrinter>) {
    let globals = globals().lock().unwrap();
    (
        globals.version_printer,
        globals.extra_version_printers.clone(),
    )
}

pub(crate) fn extra_help_text() -> Vec<String> {
    globals().lock().unwrap().extra_help.clone()
}

pub(crate) fn user_sub_commands() -> Vec<SubCommand> {
    globals().lock().unwrap().subs.clone()
}
