pub mod flows;
pub mod messages;
pub mod send;
pub mod webhook;
