pub mod backend;
pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod videos;

pub use backend::Backend;
pub use errors::{BackendError, ClientError};
pub use ids::{SessionId, VideoId};
pub use messages::{Role, Transcript, Turn};
pub use videos::VideoRef;
