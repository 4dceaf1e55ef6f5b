pub mod board_scheduler;
pub mod health;

pub use board_scheduler::BoardScheduler;
pub use health::HealthService;
