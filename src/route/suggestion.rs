//! Acknowledgement workflow for route suggestions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RegistryError;

/// Operator response to a suggested route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Noted,
    Ignored,
    Cancelled,
}

impl SuggestionStatus {
    /// Hidden suggestions are not drawn
    pub fn is_hidden(self) -> bool {
        matches!(self, Self::Rejected | Self::Ignored | Self::Cancelled)
    }

    pub fn is_acceptable(self) -> bool {
        matches!(self, Self::Pending | Self::Ignored)
    }

    pub fn is_rejectable(self) -> bool {
        matches!(self, Self::Pending | Self::Ignored)
    }

    pub fn is_noteable(self) -> bool {
        matches!(self, Self::Pending | Self::Ignored)
    }

    pub fn is_ignorable(self) -> bool {
        self == Self::Pending
    }

    pub fn is_postponable(self) -> bool {
        self == Self::Pending
    }

    /// A reply has been sent back to the originator
    pub fn is_replied(self) -> bool {
        matches!(self, Self::Accepted | Self::Noted | Self::Rejected)
    }

    /// Whether an operator may move from `self` to `to`.
    ///
    /// `Cancelled` is never an operator choice; see [`SuggestionWorkflow::cancel`].
    pub fn allows(self, to: SuggestionStatus) -> bool {
        match to {
            Self::Accepted => self.is_acceptable(),
            Self::Rejected => self.is_rejectable(),
            Self::Noted => self.is_noteable(),
            Self::Ignored => self.is_ignorable(),
            Self::Pending => self.is_postponable(),
            Self::Cancelled => false,
        }
    }
}

/// Status of a single suggestion plus the time it was last answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SuggestionWorkflow {
    status: SuggestionStatus,
    replied_at: Option<DateTime<Utc>>,
}

impl SuggestionWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SuggestionStatus {
        self.status
    }

    pub fn is_hidden(&self) -> bool {
        self.status.is_hidden()
    }

    pub fn is_replied(&self) -> bool {
        self.status.is_replied()
    }

    pub fn replied_at(&self) -> Option<DateTime<Utc>> {
        self.replied_at
    }

    /// Apply an operator response
    pub fn set_status(&mut self, status: SuggestionStatus, now: DateTime<Utc>) -> Result<(), RegistryError> {
        if !self.status.allows(status) {
            return Err(RegistryError::SuggestionTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        if status.is_replied() {
            self.replied_at = Some(now);
        }
        Ok(())
    }

    /// The originator withdrew the suggestion. Allowed from any state.
    pub fn cancel(&mut self) {
        self.status = SuggestionStatus::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SuggestionStatus; 6] = [
        SuggestionStatus::Pending,
        SuggestionStatus::Accepted,
        SuggestionStatus::Rejected,
        SuggestionStatus::Noted,
        SuggestionStatus::Ignored,
        SuggestionStatus::Cancelled,
    ];

    #[test]
    fn starts_pending_and_visible() {
        let workflow = SuggestionWorkflow::new();
        assert_eq!(workflow.status(), SuggestionStatus::Pending);
        assert!(!workflow.is_hidden());
        assert!(!workflow.is_replied());
    }

    #[test]
    fn accept_from_pending() {
        let mut workflow = SuggestionWorkflow::new();
        let now = Utc::now();
        workflow.set_status(SuggestionStatus::Accepted, now).unwrap();
        assert!(!workflow.is_hidden());
        assert!(workflow.is_replied());
        assert_eq!(workflow.replied_at(), Some(now));
    }

    #[test]
    fn cancel_from_any_state_hides() {
        for status in ALL {
            let mut workflow = SuggestionWorkflow { status, replied_at: None };
            workflow.cancel();
            assert_eq!(workflow.status(), SuggestionStatus::Cancelled);
            assert!(workflow.is_hidden());
        }
    }

    #[test]
    fn cancelled_is_not_an_operator_choice() {
        let mut workflow = SuggestionWorkflow::new();
        assert!(workflow
            .set_status(SuggestionStatus::Cancelled, Utc::now())
            .is_err());
        assert_eq!(workflow.status(), SuggestionStatus::Pending);
    }

    #[test]
    fn ignored_can_still_be_answered() {
        let mut workflow = SuggestionWorkflow::new();
        workflow.set_status(SuggestionStatus::Ignored, Utc::now()).unwrap();
        assert!(workflow.is_hidden());
        assert!(!workflow.is_replied());
        assert!(workflow.set_status(SuggestionStatus::Ignored, Utc::now()).is_err());

        workflow.set_status(SuggestionStatus::Noted, Utc::now()).unwrap();
        assert!(!workflow.is_hidden());
        assert!(workflow.is_replied());
    }

    #[test]
    fn replied_states_are_final() {
        let mut workflow = SuggestionWorkflow::new();
        workflow.set_status(SuggestionStatus::Rejected, Utc::now()).unwrap();
        assert!(workflow.is_hidden());
        for status in ALL {
            assert!(workflow.set_status(status, Utc::now()).is_err());
        }
    }

    #[test]
    fn predicate_table() {
        use SuggestionStatus::*;
        let answerable: Vec<_> = ALL.into_iter().filter(|s| s.is_acceptable()).collect();
        assert_eq!(answerable, vec![Pending, Ignored]);
        assert_eq!(
            ALL.into_iter().filter(|s| s.is_rejectable()).collect::<Vec<_>>(),
            answerable
        );
        assert_eq!(
            ALL.into_iter().filter(|s| s.is_noteable()).collect::<Vec<_>>(),
            answerable
        );
        assert_eq!(
            ALL.into_iter().filter(|s| s.is_ignorable()).collect::<Vec<_>>(),
            vec![Pending]
        );
        assert_eq!(
            ALL.into_iter().filter(|s| s.is_postponable()).collect::<Vec<_>>(),
            vec![Pending]
        );
        assert_eq!(
            ALL.into_iter().filter(|s| s.is_replied()).collect::<Vec<_>>(),
            vec![Accepted, Rejected, Noted]
        );
        assert_eq!(
            ALL.into_iter().filter(|s| s.is_hidden()).collect::<Vec<_>>(),
            vec![Rejected, Ignored, Cancelled]
        );
    }
}
