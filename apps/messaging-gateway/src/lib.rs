//! HTTP front of waflow: WhatsApp webhooks in, messages and flows out.

pub mod config;
mod handlers;
pub mod http;
mod main_logic;

pub use config::GatewayConfig;
pub use http::{ApiError, GatewayState, build_router};
pub use main_logic::{build_state, run};
pub use waflow_bus::{BusClient, BusError, InMemoryBusClient, NatsBusClient};
