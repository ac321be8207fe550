//! # Controllers: Per-Entity Behavior
//!
//! Every dynamic entity owns exactly one [`Controller`]. The controller holds
//! the attachment lifecycle; the boxed [`EntityController`] inside it holds
//! the behavior.
//!
//! ## Lifecycle
//!
//! ```text
//!                attach(activity)            detach()
//!  Unattached ───────────────────▶ Attached ─────────▶ Detached
//!                                   │  ▲                  │
//!                          retire() │  └──────────────────┘
//!                                   ▼    attach(another)
//!                                Finished
//! ```
//!
//! - `attach` while attached is [`ControllerError::AlreadyAttached`].
//! - `Finished` is terminal: `attach` there is [`ControllerError::Finished`]
//!   and the world loop passes over the entity without a warning.
//! - `detach` while not attached is [`ControllerError::NotAttached`].
//! - [`Controller::update`] calls [`Controller::require_context`] first, so a
//!   stray update after a level teardown yields `NotAttached` instead of
//!   running behavior against a dead level. The world loop checks
//!   [`Controller::attachment`] before dispatching and treats that case as a
//!   skipped frame.

mod behaviors;
mod context;
mod movable;

pub use behaviors::{Facing, KeyboardMover, KeyboardParams, Pursuer, PursuerParams};
pub use context::{UpdateContext, WorldRequests};
pub use movable::{Movable, MovementBehavior, Pace, resolve_displacement};

pub use crate::error::ControllerError;

use crate::activity::ActivityId;

/// Attachment state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Unattached,
    Attached(ActivityId),
    Detached,
    Finished,
}

/// Behavior run once per tick for one entity.
pub trait EntityController<const N: usize> {
    fn update(&mut self, cx: &mut UpdateContext<'_, N>) -> Result<(), ControllerError>;

    /// A finished controller is retired by the world loop at the end of the
    /// tick and never updated again.
    fn is_finished(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Lifecycle wrapper around a boxed [`EntityController`].
pub struct Controller<const N: usize> {
    attachment: Attachment,
    behavior: Box<dyn EntityController<N>>,
}

impl<const N: usize> Controller<N> {
    pub fn new(behavior: impl EntityController<N> + 'static) -> Self {
        Self::from_boxed(Box::new(behavior))
    }

    pub fn from_boxed(behavior: Box<dyn EntityController<N>>) -> Self {
        Self {
            attachment: Attachment::Unattached,
            behavior,
        }
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.attachment, Attachment::Attached(_))
    }

    pub fn attach(&mut self, activity: ActivityId) -> Result<(), ControllerError> {
        match self.attachment {
            Attachment::Attached(_) => Err(ControllerError::AlreadyAttached),
            Attachment::Finished => Err(ControllerError::Finished),
            Attachment::Unattached | Attachment::Detached => {
                self.attachment = Attachment::Attached(activity);
                Ok(())
            }
        }
    }

    pub fn detach(&mut self) -> Result<(), ControllerError> {
        if !self.is_attached() {
            return Err(ControllerError::NotAttached);
        }
        self.attachment = Attachment::Detached;
        Ok(())
    }

    /// Detach for good.
    pub fn retire(&mut self) -> Result<(), ControllerError> {
        self.detach()?;
        self.attachment = Attachment::Finished;
        Ok(())
    }

    /// The activity this controller runs under.
    pub fn require_context(&self) -> Result<ActivityId, ControllerError> {
        match self.attachment {
            Attachment::Attached(activity) => Ok(activity),
            _ => Err(ControllerError::NotAttached),
        }
    }

    pub fn update(&mut self, cx: &mut UpdateContext<'_, N>) -> Result<(), ControllerError> {
        self.require_context()?;
        self.behavior.update(cx)
    }

    pub fn is_finished(&self) -> bool {
        self.behavior.is_finished()
    }

    pub fn name(&self) -> &'static str {
        self.behavior.name()
    }
}

impl<const N: usize> std::fmt::Debug for Controller<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("behavior", &self.name())
            .field("attachment", &self.attachment)
            .finish()
    }
}
