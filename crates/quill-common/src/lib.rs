pub mod errors;
pub mod events;
pub mod id;
pub mod types;

pub use errors::{ConfigError, QuillError};
pub use events::{Event, EventBus};
pub use id::{new_id, ClientId, CorrelationId};
pub use types::{ConnectionState, Role, TurnStatus};

pub type Result<T> = std::result::Result<T, QuillError>;
