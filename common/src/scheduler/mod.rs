// Scheduler module: due-schedule processing and the periodic loop around it

pub mod engine;
pub mod processor;

pub use engine::{Scheduler, SchedulerEngine};
pub use processor::{build_processor, ProcessSummary, ProcessorConfig, ScheduleProcessor};
