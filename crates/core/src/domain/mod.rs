pub mod identity;
pub mod plugin;
pub mod workload;
