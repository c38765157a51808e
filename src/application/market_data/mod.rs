pub mod candle_aggregator;
pub mod event_bus;
pub mod tick_scheduler;
