//! Typed drafts accumulated across wizard steps

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;

use crate::models::{ContentStatus, ImageValue};
use crate::validation::{Fields, Schema};

/// Wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    One,
    Two,
}

impl Step {
    pub fn number(&self) -> u8 {
        match self {
            Step::One => 1,
            Step::Two => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Step::One),
            2 => Some(Step::Two),
            _ => None,
        }
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step.number()
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Step::from_number(n).ok_or_else(|| format!("invalid step {}", n))
    }
}

/// A record of optional fields filled in over one or more steps.
///
/// Every field is optional; `None` means "not provided by this step", which is
/// what makes [`Draft::merge`] well defined.
pub trait Draft:
    Fields + Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Overlay `later` onto `self`. Fields set in `later` win.
    fn merge(&mut self, later: Self);

    /// Copy of `self` restricted to the fields edited on `step`
    fn for_step(&self, step: Step) -> Self;

    /// Validation schema for `step`
    fn schema(step: Step) -> &'static Schema;

    fn image(&self) -> Option<&ImageValue>;

    fn set_image(&mut self, image: Option<ImageValue>);

    fn status(&self) -> Option<ContentStatus>;

    fn set_status(&mut self, status: ContentStatus);

    /// Consuming form of [`Draft::merge`]
    fn merged(mut self, later: Self) -> Self {
        self.merge(later);
        self
    }
}

/// Replace `slot` when `later` carries a value
pub fn overlay<T>(slot: &mut Option<T>, later: Option<T>) {
    if later.is_some() {
        *slot = later;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_later_wins_only_when_set() {
        let mut slot = Some(1);
        overlay(&mut slot, None);
        assert_eq!(slot, Some(1));
        overlay(&mut slot, Some(2));
        assert_eq!(slot, Some(2));
    }

    #[test]
    fn test_step_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Step::Two).unwrap(), "2");
        let step: Step = serde_json::from_str("1").unwrap();
        assert_eq!(step, Step::One);
        assert!(serde_json::from_str::<Step>("3").is_err());
    }
}
