//! Button-driven, multi-step activities bound to a single host message.
//!
//! An activity is started by a command, renders itself into one message and
//! keeps editing that message as its states change. The [`ActivityRegistry`]
//! routes button presses and replies back to the activity that owns the
//! message they were aimed at.

pub mod command;
pub mod context;
pub mod registry;
pub mod state;
mod timer;

pub use command::{CommandActivity, MAX_HISTORY_DEPTH};
pub use context::{ActivityContext, ActivityEnv, TriggerContext};
pub use registry::{
    ActivityRegistry, InboundEvent, RegistryStats, RouteOutcome, StartOutcome, EXPIRED_NOTICE,
    FAILURE_NOTICE,
};
pub use state::{ActivityState, Response, Transition};
