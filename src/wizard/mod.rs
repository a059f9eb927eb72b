//! Two-step create/edit wizard
//!
//! A [`Wizard`] is one session of the news or venue editor. It owns:
//! - the current step and one [`StepForm`] per step
//! - the draft accumulated from validated steps and the status side channel
//! - the entity reference, present from the start when editing and from the
//!   successful step-1 create otherwise
//! - the dirty flag, raised by form edits and status changes
//!
//! In create mode, submitting step 1 creates the entity right away and step 2
//! updates it. In edit mode, step 1 only stores its values locally and any
//! step can be opened at any time. Staged images are resolved once, when the
//! final update is sent.

pub mod draft;
mod flow;
mod form;
mod registry;
mod resolver;

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::gateway::GatewayError;
use crate::models::{ContentStatus, HasStatus, ImageValue, StatusCategory};
use crate::staging::StagedImage;
use crate::validation::FieldErrors;

pub use draft::{Draft, Step};
pub use flow::{NewsFlow, VenueFlow, WizardFlow};
pub use form::StepForm;
pub use registry::{RegistryError, WizardRegistry};
pub use resolver::{ImageRemover, ImageResolver, Resolution, ResolveError, ResolvedImage};

/// Whether the session creates a new entity or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Create,
    Edit,
}

/// Result of a successful submission
#[derive(Debug, Clone)]
pub enum Outcome<E> {
    /// Moved on to the given step
    Advanced(Step),
    /// Persisted without leaving the current step
    Saved(E),
    /// Final step persisted; create flows carry the redirect target
    Completed { entity: E, redirect: Option<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Image(#[from] ResolveError),

    #[error("Save failed: {0}")]
    Mutation(#[from] GatewayError),

    #[error("Step {} is not available yet", .0.number())]
    StepUnavailable(Step),

    #[error("Only an edit session can be updated in place")]
    NotEditing,
}

impl WizardError {
    /// Message for the error banner
    pub fn user_message(&self) -> String {
        match self {
            WizardError::Validation(_) => "Please fix the highlighted fields.".to_string(),
            WizardError::Image(e) => e.user_message(),
            WizardError::Mutation(e) => e.user_message(),
            WizardError::StepUnavailable(_) | WizardError::NotEditing => self.to_string(),
        }
    }
}

pub struct Wizard<F: WizardFlow> {
    flow: F,
    resolver: ImageResolver,
    mode: Mode,
    step: Step,
    step_one: StepForm<F::Draft>,
    step_two: StepForm<F::Draft>,
    draft: F::Draft,
    entity: Option<F::Entity>,
    dirty: Arc<AtomicBool>,
    placeholder: String,
    last_error: Option<String>,
}

impl<F: WizardFlow> std::fmt::Debug for Wizard<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("kind", &F::KIND)
            .field("mode", &self.mode)
            .field("step", &self.step)
            .field("entity_id", &self.entity_id())
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

impl<F: WizardFlow> Wizard<F> {
    /// Session that creates a new entity. `placeholder` is the image key the
    /// entity is created with unless step 1 already carries a stored one.
    pub fn create(flow: F, resolver: ImageResolver, placeholder: impl Into<String>) -> Self {
        Self::build(flow, resolver, Mode::Create, F::Draft::default(), None, placeholder.into())
    }

    /// Session that edits `entity`, seeded with its current values
    pub fn edit(flow: F, resolver: ImageResolver, entity: F::Entity) -> Self {
        let draft = F::draft_from_entity(&entity);
        Self::build(flow, resolver, Mode::Edit, draft, Some(entity), String::new())
    }

    fn build(
        flow: F,
        resolver: ImageResolver,
        mode: Mode,
        draft: F::Draft,
        entity: Option<F::Entity>,
        placeholder: String,
    ) -> Self {
        let dirty = Arc::new(AtomicBool::new(false));
        let form = |step| {
            let dirty = dirty.clone();
            StepForm::new(step, &draft).on_change(move || dirty.store(true, Ordering::SeqCst))
        };
        let step_one = form(Step::One);
        let step_two = form(Step::Two);
        Self {
            flow,
            resolver,
            mode,
            step: Step::One,
            step_one,
            step_two,
            draft,
            entity,
            dirty,
            placeholder,
            last_error: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn entity(&self) -> Option<&F::Entity> {
        self.entity.as_ref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity.as_ref().map(F::entity_id)
    }

    /// Data accumulated from validated steps and the status side channel
    pub fn draft(&self) -> &F::Draft {
        &self.draft
    }

    pub fn form(&self, step: Step) -> &StepForm<F::Draft> {
        match step {
            Step::One => &self.step_one,
            Step::Two => &self.step_two,
        }
    }

    fn form_mut(&mut self, step: Step) -> &mut StepForm<F::Draft> {
        match step {
            Step::One => &mut self.step_one,
            Step::Two => &mut self.step_two,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Step 2 needs an entity in create mode; edit mode has no gates
    pub fn can_open(&self, step: Step) -> bool {
        match (self.mode, step) {
            (Mode::Edit, _) | (_, Step::One) => true,
            (Mode::Create, Step::Two) => self.entity.is_some(),
        }
    }

    pub fn open(&mut self, step: Step) -> Result<(), WizardError> {
        if !self.can_open(step) {
            return Err(WizardError::StepUnavailable(step));
        }
        self.step = step;
        Ok(())
    }

    /// Step 2 back to step 1; entered step-2 values are kept
    pub fn back(&mut self) -> Step {
        self.step = Step::One;
        self.step
    }

    /// Edit fields of `step`. Images only change through
    /// [`Wizard::stage_image`] and [`Wizard::remove_image`].
    pub fn apply(&mut self, step: Step, patch: F::Draft) {
        let mut patch = patch.for_step(step);
        patch.set_image(None);
        self.form_mut(step).apply(patch);
    }

    /// Status toggle outside the steps; sent with the next save
    pub fn set_status(&mut self, status: ContentStatus) {
        self.draft.set_status(status);
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Park an image for upload on the final save and select it
    pub async fn stage_image(&mut self, image: StagedImage) -> String {
        let token = self.resolver.store().stage(image).await;
        self.replace_image(ImageValue::Staged(token.clone())).await;
        token
    }

    /// Cancel a staged image, or mark the stored one for removal
    pub async fn remove_image(&mut self) {
        let next = match self.entity.as_ref().and_then(F::entity_image) {
            Some(key) if !key.is_empty() => ImageValue::MarkedForRemoval,
            _ => ImageValue::Empty,
        };
        self.replace_image(next).await;
    }

    async fn replace_image(&mut self, next: ImageValue) {
        if let Some(ImageValue::Staged(token)) = self.step_two.values().image() {
            self.resolver.store().discard(token).await;
        }
        self.step_two.set_image(Some(next));
    }

    /// Release what the session holds; called when it is thrown away
    pub async fn discard(&mut self) {
        if let Some(ImageValue::Staged(token)) = self.step_two.values().image() {
            self.resolver.store().discard(token).await;
        }
    }

    /// Submit the current step
    pub async fn submit(&mut self) -> Result<Outcome<F::Entity>, WizardError> {
        let result = match self.step {
            Step::One => self.submit_step_one().await,
            Step::Two => self.submit_step_two().await,
        };
        self.record(result)
    }

    /// Edit mode: submit the current step and persist everything right away
    pub async fn update(&mut self) -> Result<Outcome<F::Entity>, WizardError> {
        let result = self.update_in_place().await;
        self.record(result)
    }

    fn record(
        &mut self,
        result: Result<Outcome<F::Entity>, WizardError>,
    ) -> Result<Outcome<F::Entity>, WizardError> {
        self.last_error = match &result {
            Err(WizardError::Validation(_)) | Ok(_) => None,
            Err(e) => {
                tracing::warn!(kind = F::KIND, step = self.step.number(), error = %e, "Wizard submission failed");
                Some(e.user_message())
            }
        };
        result
    }

    async fn submit_step_one(&mut self) -> Result<Outcome<F::Entity>, WizardError> {
        let validated = self.step_one.submit().map_err(WizardError::Validation)?;
        let candidate = self.draft.clone().merged(validated);

        match (self.mode, self.entity_id().map(str::to_string)) {
            (Mode::Edit, _) => {
                self.draft = candidate;
            }
            (Mode::Create, None) => {
                let key = match candidate.image() {
                    Some(ImageValue::Stored(key)) => key.clone(),
                    _ => self.placeholder.clone(),
                };
                let resolved = self
                    .resolver
                    .resolve(Some(&ImageValue::Stored(key)), None, &self.flow)
                    .await?;
                let entity = self.flow.create(&candidate, resolved.as_ref()).await?;
                tracing::info!(kind = F::KIND, id = %F::entity_id(&entity), "Created entity from step 1");

                self.draft = candidate;
                if let Some(resolved) = &resolved {
                    self.draft.set_image(Some(resolved.to_image_value()));
                }
                self.entity = Some(entity);
                self.dirty.store(false, Ordering::SeqCst);
            }
            (Mode::Create, Some(id)) => {
                // Back on step 1 after the entity was created
                let entity = self.flow.update(&id, &candidate, None).await?;
                self.draft = candidate;
                self.entity = Some(entity);
            }
        }

        self.step = Step::Two;
        Ok(Outcome::Advanced(Step::Two))
    }

    async fn submit_step_two(&mut self) -> Result<Outcome<F::Entity>, WizardError> {
        let merged = self.collect(Step::Two)?;
        let entity = self.persist(merged).await?;

        let redirect = match self.mode {
            Mode::Create => Some(F::redirect_path(&entity)),
            Mode::Edit => None,
        };
        tracing::info!(kind = F::KIND, id = %F::entity_id(&entity), mode = ?self.mode, "Wizard completed");
        Ok(Outcome::Completed { entity, redirect })
    }

    async fn update_in_place(&mut self) -> Result<Outcome<F::Entity>, WizardError> {
        if self.mode != Mode::Edit {
            return Err(WizardError::NotEditing);
        }
        let merged = self.collect(self.step)?;
        let entity = self.persist(merged).await?;
        Ok(Outcome::Saved(entity))
    }

    /// Validate `current` and every other step holding unsaved edits, and
    /// merge them over the draft in step order. A failing step is opened so
    /// its errors are on screen.
    fn collect(&mut self, current: Step) -> Result<F::Draft, WizardError> {
        let mut merged = self.draft.clone();
        for step in [Step::One, Step::Two] {
            if step != current && !self.form(step).is_edited() {
                continue;
            }
            match self.form_mut(step).submit() {
                Ok(values) => merged = merged.merged(values),
                Err(errors) => {
                    self.step = step;
                    return Err(WizardError::Validation(errors));
                }
            }
        }
        Ok(merged)
    }

    /// Resolve the image, then update the entity with `merged`
    async fn persist(&mut self, mut merged: F::Draft) -> Result<F::Entity, WizardError> {
        let id = self
            .entity_id()
            .map(str::to_string)
            .ok_or(WizardError::StepUnavailable(Step::Two))?;

        let resolved = self
            .resolver
            .resolve(merged.image(), Some(&id), &self.flow)
            .await?;
        if let Some(resolved) = &resolved {
            // A retry after a failed update must not upload or remove again
            merged.set_image(Some(resolved.to_image_value()));
            if resolved.resolution() != Resolution::Unchanged {
                self.step_two.set_image(Some(resolved.to_image_value()));
            }
        }

        let entity = self.flow.update(&id, &merged, resolved.as_ref()).await?;

        self.step_one.reset(&merged);
        self.step_two.reset(&merged);
        self.draft = merged;
        self.entity = Some(entity.clone());
        self.dirty.store(false, Ordering::SeqCst);
        Ok(entity)
    }

    /// Badge category: the pending status toggle, else the saved entity's
    pub fn status_category(&self) -> Option<StatusCategory> {
        self.draft
            .status()
            .map(|status| status.category())
            .or_else(|| self.entity.as_ref().map(HasStatus::status_category))
    }

    /// Serializable snapshot for the UI
    pub fn view(&self) -> WizardView<F::Entity, F::Draft> {
        WizardView {
            kind: F::KIND,
            mode: self.mode,
            step: self.step,
            dirty: self.is_dirty(),
            entity_id: self.entity_id().map(str::to_string),
            entity: self.entity.clone(),
            can_open_step_two: self.can_open(Step::Two),
            status: self.draft.status(),
            status_category: self.status_category(),
            steps: [StepView::of(&self.step_one), StepView::of(&self.step_two)],
            last_error: self.last_error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView<D> {
    pub step: Step,
    pub values: D,
    pub errors: FieldErrors,
}

impl<D: Draft> StepView<D> {
    fn of(form: &StepForm<D>) -> Self {
        Self {
            step: form.step(),
            values: form.values().clone(),
            errors: form.errors().clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardView<E, D> {
    pub kind: &'static str,
    pub mode: Mode,
    pub step: Step,
    pub dirty: bool,
    pub entity_id: Option<String>,
    pub entity: Option<E>,
    pub can_open_step_two: bool,
    pub status: Option<ContentStatus>,
    pub status_category: Option<StatusCategory>,
    pub steps: [StepView<D>; 2],
    pub last_error: Option<String>,
}
