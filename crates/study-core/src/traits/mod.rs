//! Ports the service layer depends on

mod clock;
mod notifier;
mod realtime;
mod repositories;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notifier::{InviteNotifier, NoopNotifier};
pub use realtime::ChangePublisher;
pub use repositories::{
    GroupRepository, InviteRepository, MemberRepository, ProfileRepository, RepoResult,
};
