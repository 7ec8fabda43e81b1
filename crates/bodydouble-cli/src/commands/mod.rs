pub mod ack;
pub mod chore;
pub mod config;
pub mod queue;
pub mod run;
pub mod session;
pub mod task;
