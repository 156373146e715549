pub mod framer;
pub mod listener;
pub mod request;
pub mod response;
pub mod router;
pub mod shutdown;

pub use listener::spawn_listener;
pub use response::Response;
pub use shutdown::ShutdownFlag;
