//! Dispatch cycle engine
//!
//! The cycle runs the fetch→write→report sequence; the scheduler fires it
//! on a fixed interval and guarantees runs never overlap.

pub mod dispatch;
pub mod scheduler;
