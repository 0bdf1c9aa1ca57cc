//! Tool transports
//!
//! Only the in-process [`LocalToolServer`] ships with omnitool; remote
//! transports plug in through the
//! [`ServerConnector`](omnitool_application::ServerConnector) port.

pub mod builtin;
mod local_server;

pub use local_server::{LOCAL_SERVER_KIND, LocalServerConnector, LocalToolServer};
