pub mod envelope;
pub mod error;
pub mod event;
pub mod hooks;
