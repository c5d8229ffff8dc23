//! Invite lifecycle controller
//!
//! Coordinates service calls with the query cache for one signed-in viewer.

mod feedback;
mod fetcher;
mod lifecycle;

pub use feedback::{Feedback, InviteAction};
pub use fetcher::ServiceFetcher;
pub use lifecycle::InviteLifecycleController;
