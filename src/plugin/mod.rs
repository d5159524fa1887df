//! The signal checker, packaged as a class decorator hook for the analyzer.

pub mod api;
pub mod argmap;
pub mod check;
pub mod resolve;
pub mod scan;

#[cfg(test)]
pub(crate) mod testing;

use crate::CheckOptions;
use crate::registry::SignalRegistry;
use api::{ClassHook, Plugin};
use check::SignalChecker;

/// Routes classes carrying the configured class decorator to the [`SignalChecker`].
pub struct SignalPlugin<'r> {
    checker: SignalChecker<'r>,
    class_decorator: String,
}

impl<'r> SignalPlugin<'r> {
    pub fn new(registry: &'r SignalRegistry, options: &CheckOptions) -> Self {
        Self {
            checker: SignalChecker {
                registry,
                receiver: options.receiver.clone(),
                handler_decorator: options.handler_decorator.clone(),
            },
            class_decorator: options.class_decorator.clone(),
        }
    }
}

impl Plugin for SignalPlugin<'_> {
    fn class_decorator_hook(&self, fullname: &str) -> Option<&dyn ClassHook> {
        (fullname == self.class_decorator).then_some(&self.checker as &dyn ClassHook)
    }
}
