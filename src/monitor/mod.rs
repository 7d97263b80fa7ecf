pub mod console;
pub mod events;
pub mod metrics;

pub use events::{EventLog, LoggedEvent, ProcessRef, SimulationEvent, SimulationLogger, SwapDirection};
pub use metrics::{MetricsCollector, MetricsSummary, ProcessTimes, SimulationMetrics};
