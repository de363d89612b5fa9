//! Static description of a wizard: its ordered steps, each with a form and a
//! transformer.

use std::fmt;

use crate::error::WizardError;
use crate::transform::StepTransformer;
use crate::validation::FormDescriptor;

/// Identifies a wizard step. The `Ord` implementation must follow the
/// navigation order; [`WizardDefinition::new`] enforces this.
pub trait StepName: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> StepName for T where T: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {}

#[derive(Debug, Clone)]
pub struct StepDefinition<S: StepName> {
    pub step: S,
    pub form: FormDescriptor,
    pub transform: StepTransformer,
}

impl<S: StepName> StepDefinition<S> {
    pub fn new(step: S, form: FormDescriptor, transform: StepTransformer) -> Self {
        Self {
            step,
            form,
            transform,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WizardDefinition<S: StepName> {
    steps: Vec<StepDefinition<S>>,
}

impl<S: StepName> WizardDefinition<S> {
    pub fn new(steps: Vec<StepDefinition<S>>) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::Definition("a wizard needs at least one step".into()));
        }
        if let Some(pair) = steps.windows(2).find(|pair| pair[0].step >= pair[1].step) {
            return Err(WizardError::Definition(format!(
                "step {} must sort before {}",
                pair[0].step, pair[1].step
            )));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> impl Iterator<Item = S> + '_ {
        self.steps.iter().map(|definition| definition.step)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first(&self) -> S {
        self.steps[0].step
    }

    pub fn last(&self) -> S {
        self.steps[self.steps.len() - 1].step
    }

    pub fn index_of(&self, step: S) -> Option<usize> {
        self.steps.iter().position(|definition| definition.step == step)
    }

    pub fn step_at(&self, index: usize) -> Option<S> {
        self.steps.get(index).map(|definition| definition.step)
    }

    pub fn get(&self, step: S) -> Result<&StepDefinition<S>, WizardError> {
        self.steps
            .iter()
            .find(|definition| definition.step == step)
            .ok_or_else(|| WizardError::UnknownStep(step.to_string()))
    }

    /// Resolves a step by its display key or its 1-based number.
    pub fn resolve(&self, key: &str) -> Result<S, WizardError> {
        let needle = key.trim();
        if let Ok(number) = needle.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|index| self.step_at(index))
                .ok_or_else(|| WizardError::UnknownStep(needle.to_string()));
        }
        self.steps()
            .find(|step| step.to_string().eq_ignore_ascii_case(needle))
            .ok_or_else(|| WizardError::UnknownStep(needle.to_string()))
    }
}
