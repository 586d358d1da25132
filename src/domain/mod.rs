pub mod errors;
pub mod portfolio;
pub mod ports;
pub mod repositories;
pub mod types;
pub mod validation;
