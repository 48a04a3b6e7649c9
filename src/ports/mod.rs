//! Port traits: seams between the domain core and external collaborators.

pub mod config_port;
pub mod data_port;
pub mod event_port;
