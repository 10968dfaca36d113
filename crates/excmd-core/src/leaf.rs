//! Leaf commands wrapping user-supplied units of work

use crate::command::Command;
use crate::errors::{ExecError, FatalError};
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use crate::sync::lock_unpoisoned;
use std::sync::{Arc, Mutex};

type Action = Box<dyn Fn() -> Result<(), ExecError> + Send + Sync>;
type InputAction<I> = Box<dyn Fn(&I) -> Result<(), ExecError> + Send + Sync>;
type IoAction<I, O> = Box<dyn Fn(&I) -> Result<O, ExecError> + Send + Sync>;

/// Leaf running a zero-argument unit of work once per run
pub struct SimpleCommand {
    core: CommandCore,
    action: Action,
}

impl SimpleCommand {
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() -> Result<(), ExecError> + Send + Sync + 'static,
    {
        Self::with_name("Simple", action)
    }

    pub fn with_name<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> Result<(), ExecError> + Send + Sync + 'static,
    {
        Self {
            core: CommandCore::new(name),
            action: Box::new(action),
        }
    }

    /// Named leaf that does nothing
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_name(name, || Ok(()))
    }

    /// Placeholder leaf for optional slots
    ///
    /// Every call returns a distinct instance; placing one instance in two
    /// trees would let their runs interfere.
    pub fn null() -> Arc<Self> {
        Arc::new(Self::named("Do nothing"))
    }
}

impl Command for SimpleCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn execute(&self, _ctx: &RunContext) -> Result<(), ExecError> {
        (self.action)()
    }
}

/// Leaf whose unit of work reads an input set before the run
pub struct SimpleInputCommand<I> {
    core: CommandCore,
    input: Mutex<Option<Arc<I>>>,
    action: InputAction<I>,
}

impl<I: Send + Sync + 'static> SimpleInputCommand<I> {
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&I) -> Result<(), ExecError> + Send + Sync + 'static,
    {
        Self::with_name("Simple(Input)", action)
    }

    pub fn with_name<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&I) -> Result<(), ExecError> + Send + Sync + 'static,
    {
        Self {
            core: CommandCore::new(name),
            input: Mutex::new(None),
            action: Box::new(action),
        }
    }

    pub fn set_input(&self, input: I) {
        *lock_unpoisoned(&self.input) = Some(Arc::new(input));
    }

    pub fn with_input(self, input: I) -> Self {
        self.set_input(input);
        self
    }
}

impl<I: Clone + Send + Sync> SimpleInputCommand<I> {
    pub fn input(&self) -> Option<I> {
        lock_unpoisoned(&self.input).as_deref().cloned()
    }
}

impl<I: Send + Sync> Command for SimpleInputCommand<I> {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn execute(&self, _ctx: &RunContext) -> Result<(), ExecError> {
        // released before the action so it can read or replace the input
        let input = lock_unpoisoned(&self.input)
            .clone()
            .ok_or_else(|| FatalError::missing_input(self.core.name()))?;
        (self.action)(&input)
    }
}

/// Leaf mapping a settable input to a readable output
pub struct SimpleIoCommand<I, O> {
    core: CommandCore,
    input: Mutex<Option<Arc<I>>>,
    output: Mutex<Option<O>>,
    action: IoAction<I, O>,
}

impl<I: Send + Sync + 'static, O: Send + 'static> SimpleIoCommand<I, O> {
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&I) -> Result<O, ExecError> + Send + Sync + 'static,
    {
        Self::with_name("Simple(Input, Output)", action)
    }

    pub fn with_name<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&I) -> Result<O, ExecError> + Send + Sync + 'static,
    {
        Self {
            core: CommandCore::new(name),
            input: Mutex::new(None),
            output: Mutex::new(None),
            action: Box::new(action),
        }
    }

    pub fn set_input(&self, input: I) {
        *lock_unpoisoned(&self.input) = Some(Arc::new(input));
    }

    pub fn with_input(self, input: I) -> Self {
        self.set_input(input);
        self
    }
}

impl<I: Send + Sync, O: Clone + Send> SimpleIoCommand<I, O> {
    /// Output of the last successful run
    pub fn output(&self) -> Option<O> {
        lock_unpoisoned(&self.output).clone()
    }
}

impl<I: Send + Sync, O: Send> Command for SimpleIoCommand<I, O> {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn execute(&self, _ctx: &RunContext) -> Result<(), ExecError> {
        let input = lock_unpoisoned(&self.input)
            .clone()
            .ok_or_else(|| FatalError::missing_input(self.core.name()))?;
        let output = (self.action)(&input)?;
        *lock_unpoisoned(&self.output) = Some(output);
        Ok(())
    }
}
