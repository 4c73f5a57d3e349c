//! Concurrent reconciliation
//!
//! The engine itself is shared read-only between workers, so the only
//! concurrent structure needed is the batch processor's outcome map:
//!
//! - **BatchProcessor**: reconciles a batch of alerts on tokio's blocking pool
//!   and collects outcomes by row index in a DashMap

pub mod batch_processor;

pub use batch_processor::BatchProcessor;
