pub mod publish;
pub mod random;
pub mod status;
pub mod trigger;

pub use publish::Publisher;
pub use status::{PublishedPost, TriggerState, TriggerStatus};
pub use trigger::{AutoBlogTrigger, ForcedRunRejected, TickOutcome};
