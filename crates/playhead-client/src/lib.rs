pub mod http;
pub mod mock;

pub use http::{HttpBackend, DEFAULT_BASE_URL};
pub use mock::{MockBackend, MockResponse};
