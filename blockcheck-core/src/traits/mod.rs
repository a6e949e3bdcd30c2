//! Network probe abstraction trait definition

mod network_probe;

pub use network_probe::NetworkProbe;
