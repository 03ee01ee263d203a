mod config;
mod service;

pub use config::GateConfig;
pub use service::RequestGate;
