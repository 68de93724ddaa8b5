//! Robin relay — forwards mail sent to list addresses on to each list's subscribers.

pub mod channels;
pub mod config;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod routes;
pub mod store;
