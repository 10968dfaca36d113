use super::{adopt_outcome, should_stop};
use crate::command::{Command, CommandRef};
use crate::errors::ExecError;
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared slot through which a `GenericCyclicCommand` hands the current
/// element to its core command
#[derive(Debug)]
pub struct CycleBinding<T> {
    slot: Arc<RwLock<Option<T>>>,
}

impl<T> Clone for CycleBinding<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Default for CycleBinding<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
        }
    }
}

impl<T: Clone> CycleBinding<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current element, `None` before the first cycle
    pub fn get(&self) -> Option<T> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: T) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }
}

/// Runs the core command once per element of a collection
///
/// Before each cycle the element is published through the [`CycleBinding`]
/// the core command was built with.
pub struct GenericCyclicCommand<T> {
    core: CommandCore,
    core_command: CommandRef,
    items: Vec<T>,
    binding: CycleBinding<T>,
    current_cycle: AtomicUsize,
}

impl<T: Clone + Send + Sync + 'static> GenericCyclicCommand<T> {
    pub fn new<I>(core_command: CommandRef, items: I, binding: CycleBinding<T>) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::with_name("Generic Cyclic", core_command, items, binding)
    }

    pub fn with_name<I>(
        name: impl Into<String>,
        core_command: CommandRef,
        items: I,
        binding: CycleBinding<T>,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self {
            core: CommandCore::new(name),
            core_command,
            items: items.into_iter().collect(),
            binding,
            current_cycle: AtomicUsize::new(0),
        }
    }

    pub fn core_command(&self) -> &CommandRef {
        &self.core_command
    }

    pub fn binding(&self) -> &CycleBinding<T> {
        &self.binding
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Element of the cycle in progress, or of the cycle the last run stopped at
    pub fn current_element(&self) -> Option<T> {
        self.binding.get()
    }

    pub fn current_cycle(&self) -> usize {
        self.current_cycle.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + Sync + 'static> Command for GenericCyclicCommand<T> {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        vec![self.core_command.clone()]
    }

    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError> {
        self.current_cycle.store(0, Ordering::SeqCst);
        for item in &self.items {
            self.binding.set(item.clone());
            self.current_cycle.fetch_add(1, Ordering::SeqCst);
            self.core_command.run_with(ctx)?;
            self.core.checkpoint();
            if should_stop(&self.core, &self.core_command) {
                break;
            }
        }
        Ok(())
    }

    fn check_errors(&self) {
        if self.current_cycle() > 0 {
            adopt_outcome(&self.core, &self.core_command);
        }
    }
}
