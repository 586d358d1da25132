pub mod account_engine;
pub mod portfolio_service;
pub mod trade_engine;
pub mod user_locks;
