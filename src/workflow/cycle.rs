use serde::Serialize;

use crate::workflow::error::IntakeError;

/// Where the single active upload cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CycleState {
    #[default]
    Idle,
    Staged,
    Uploading,
    Reviewing,
    Submitting,
    Failed,
}

/// Things that move a cycle forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleEvent {
    /// Files were added to the stager
    Stage,
    /// Every staged file was removed again
    Unstage,
    /// Upload button pressed
    StartUpload,
    /// All uploads resolved; `any_success` says whether a form can be shown
    UploadsSettled { any_success: bool },
    /// Submit button pressed on the review form
    Submit,
    /// Webhook accepted the payload; `more_pending` if other forms wait
    SubmitSucceeded { more_pending: bool },
    /// Active form thrown away without submitting
    Discard { more_pending: bool },
    /// Webhook rejected the payload or was unreachable
    SubmitFailed,
    /// Reopen a previously saved payload for review
    Resume,
    /// Start over
    Reset,
}

impl CycleState {
    /// Compute the next state, rejecting events that make no sense here.
    pub fn apply(self, event: CycleEvent) -> Result<CycleState, IntakeError> {
        use CycleEvent as E;
        use CycleState as S;

        let next = match (self, event) {
            (_, E::Reset) => S::Idle,

            (S::Idle | S::Staged | S::Failed, E::Stage) => S::Staged,
            (S::Staged, E::Unstage) => S::Idle,

            (S::Staged, E::StartUpload) => S::Uploading,
            (S::Uploading, E::UploadsSettled { any_success: true }) => S::Reviewing,
            (S::Uploading, E::UploadsSettled { any_success: false }) => S::Failed,

            (S::Idle | S::Failed, E::Resume) => S::Reviewing,
            (S::Reviewing, E::Submit) => S::Submitting,
            (S::Submitting, E::SubmitSucceeded { more_pending: true }) => S::Reviewing,
            (S::Submitting, E::SubmitSucceeded { more_pending: false }) => S::Idle,
            (S::Submitting, E::SubmitFailed) => S::Reviewing,
            (S::Reviewing, E::Discard { more_pending: true }) => S::Reviewing,
            (S::Reviewing, E::Discard { more_pending: false }) => S::Idle,

            (state, event) => return Err(IntakeError::InvalidTransition { state, event }),
        };

        Ok(next)
    }

    /// Whether the upload widget should be visible in this state.
    pub fn shows_upload_widget(self) -> bool {
        !matches!(self, CycleState::Reviewing | CycleState::Submitting)
    }
}
