pub mod http;
pub mod services;
pub mod transport;

pub use http::HttpBridge;
pub use transport::ServiceBridge;
