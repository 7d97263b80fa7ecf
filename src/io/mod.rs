pub mod config;
pub mod loader;
pub mod program;

pub use config::{ConcurrentConfig, MlfqConfig, SimulationConfig};
pub use loader::{load_config, parse_config};
pub use program::ProcessConfig;
