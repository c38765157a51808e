pub mod alert_service;
pub mod bb_width_monitor;
pub mod bootstrap;
pub mod group_scheduler;
pub mod market_data;
pub mod order_router;
pub mod process_orchestrator;
pub mod strategies;
pub mod system;
