//! Network implementations for forwarding requests

pub mod origin;

pub use origin::OriginNetwork;
