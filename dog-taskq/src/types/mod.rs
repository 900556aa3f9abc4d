pub mod ids;
pub mod payload;
pub mod status;

pub use ids::{ConsumerId, MessageId};
pub use payload::Payload;
pub use status::{ConsumerState, MessageStatus};
