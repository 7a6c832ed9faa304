//! Application root: owns stacks in registration order.

use super::error::{Result, SynthError};
use super::stack::{Stack, StackProps};
use super::types::SynthesizedTemplate;
use indexmap::IndexMap;
use std::thread;
use tracing::{info, info_span};

#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: IndexMap<String, Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new stack and return it for population.
    pub fn add_stack(&mut self, name: &str, props: StackProps) -> Result<&mut Stack> {
        if self.stacks.contains_key(name) {
            return Err(SynthError::DuplicateStack {
                name: name.to_string(),
            });
        }
        let stack = Stack::new(name, props)?;
        Ok(self.stacks.entry(name.to_string()).or_insert(stack))
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.get(name)
    }

    pub fn stack_mut(&mut self, name: &str) -> Option<&mut Stack> {
        self.stacks.get_mut(name)
    }

    /// Stacks in registration order.
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Synthesize every stack in registration order, stopping at the first
    /// failure. Stacks synthesized before the failure keep their template.
    pub fn synthesize_all(&mut self) -> Result<IndexMap<String, SynthesizedTemplate>> {
        let _span = info_span!("synthesize_all", stacks = self.stacks.len()).entered();
        let mut templates = IndexMap::with_capacity(self.stacks.len());

        for (name, stack) in self.stacks.iter_mut() {
            let template = stack.synthesize().map_err(|e| wrap(name, e))?;
            templates.insert(name.clone(), template);
        }

        info!(stacks = templates.len(), "app synthesized");
        Ok(templates)
    }

    /// Like [`synthesize_all`](Self::synthesize_all), with one thread per
    /// stack. Every stack is attempted; the reported error is the first in
    /// registration order.
    pub fn synthesize_all_parallel(&mut self) -> Result<IndexMap<String, SynthesizedTemplate>> {
        let _span = info_span!("synthesize_all_parallel", stacks = self.stacks.len()).entered();

        let results: Vec<(String, Result<SynthesizedTemplate>)> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .stacks
                .iter_mut()
                .map(|(name, stack)| (name.clone(), scope.spawn(move || stack.synthesize())))
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| match handle.join() {
                    Ok(result) => (name, result),
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut templates = IndexMap::with_capacity(results.len());
        for (name, result) in results {
            let template = result.map_err(|e| wrap(&name, e))?;
            templates.insert(name, template);
        }

        info!(stacks = templates.len(), "app synthesized");
        Ok(templates)
    }
}

fn wrap(stack: &str, source: SynthError) -> SynthError {
    SynthError::Stack {
        stack: stack.to_string(),
        source: Box::new(source),
    }
}
