//! Per-step form controller

use crate::models::ImageValue;
use crate::validation::FieldErrors;

use super::draft::{Draft, Step};

type ChangeListener = Box<dyn Fn() + Send + Sync>;

/// Values and errors of one wizard step.
///
/// The owning orchestrator drives it through [`StepForm::submit`], and learns
/// about edits through the change listener.
pub struct StepForm<D: Draft> {
    step: Step,
    values: D,
    errors: FieldErrors,
    /// Edited since seeding or the last save
    edited: bool,
    on_change: Option<ChangeListener>,
}

impl<D: Draft> std::fmt::Debug for StepForm<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepForm")
            .field("step", &self.step)
            .field("values", &self.values)
            .field("errors", &self.errors)
            .field("edited", &self.edited)
            .finish_non_exhaustive()
    }
}

impl<D: Draft> StepForm<D> {
    /// Form for `step`, seeded with that step's share of `initial`
    pub fn new(step: Step, initial: &D) -> Self {
        Self {
            step,
            values: initial.for_step(step),
            errors: FieldErrors::new(),
            edited: false,
            on_change: None,
        }
    }

    pub fn on_change(mut self, listener: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_change = Some(Box::new(listener));
        self
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn values(&self) -> &D {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Whether the form holds values that have not been saved yet
    pub fn is_edited(&self) -> bool {
        self.edited
    }

    fn notify(&mut self) {
        self.edited = true;
        if let Some(listener) = &self.on_change {
            listener();
        }
    }

    /// Apply edited fields. Fields that belong to other steps are ignored.
    pub fn apply(&mut self, patch: D) {
        self.values.merge(patch.for_step(self.step));
        self.notify();
    }

    pub fn set_image(&mut self, image: Option<ImageValue>) {
        self.values.set_image(image);
        self.notify();
    }

    /// Replace values after a save, without counting as an edit
    pub fn reset(&mut self, values: &D) {
        self.values = values.for_step(self.step);
        self.errors = FieldErrors::new();
        self.edited = false;
    }

    /// Validate and return the step's data, or keep the errors for display
    pub fn submit(&mut self) -> Result<D, FieldErrors> {
        match D::schema(self.step).validate(&self.values) {
            Ok(()) => {
                self.errors = FieldErrors::new();
                Ok(self.values.clone())
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }
}
