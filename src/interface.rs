//! Where diagnostics and renderings go.
//!
//! The entry point writes through a `UserInterface` so callers (and tests)
//! can capture output instead of letting it hit the process streams.

use crate::error::ParseError;

pub trait UserInterface: Send {
    fn print(&self, message: String);
    fn print_error(&self, error: &ParseError);
}

/// Writes messages to stdout and diagnostics to stderr, prefixed by the
/// program name with a `-help` hint.
#[derive(Default)]
pub struct ConsoleInterface {
    pub(crate) program: String,
}

impl ConsoleInterface {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl UserInterface for ConsoleInterface {
    fn print(&self, message: String) {
        println!("{message}");
    }

    fn print_error(&self, error: &ParseError) {
        if self.program.is_empty() {
            eprintln!("{error}");
        } else {
            eprintln!("{program}: {error}", program = self.program);
            eprintln!(
                "{program}: try '-help' for more information",
                program = self.program
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod util {
    use super::*;
    use std::sync::Mutex;

    /// Captures everything in memory for assertion.
    #[derive(Default)]
    pub(crate) struct InMemoryInterface {
        messages: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl UserInterface for InMemoryInterface {
        fn print(&self, message: String) {
            self.messages.lock().unwrap().push(message);
        }

        fn print_error(&self, error: &ParseError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    impl InMemoryInterface {
        pub(crate) fn consume(self) -> (Option<String>, Option<String>) {
            let messages = self.messages.into_inner().unwrap();
            let errors = self.errors.into_inner().unwrap();
            (join(messages), join(errors))
        }

        pub(crate) fn consume_message(self) -> String {
            let (message, error) = self.consume();
            assert_eq!(error, None);
            message.unwrap()
        }

        pub(crate) fn consume_error(self) -> String {
            let (message, error) = self.consume();
            assert_eq!(message, None);
            error.unwrap()
        }
    }

    fn join(lines: Vec<String>) -> Option<String> {
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}
