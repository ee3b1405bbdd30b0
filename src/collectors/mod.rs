//! Single-metric probes. Each reads procfs (or `sysinfo`) and hands one
//! value to the alert classifier.

pub mod cpu;
pub mod disk;
pub mod load;
pub mod memory;
pub mod network;
