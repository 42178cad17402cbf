//! Form-filling agent: the step loop and the submission controller around it.

pub mod action;
pub mod action_loop;
pub mod controller;

pub use action::{Action, ActionKind, DocumentKind};
pub use action_loop::{ActionLoop, LoopOutcome, LoopSettings};
pub use controller::{SubmissionController, SubmissionOutcome};
