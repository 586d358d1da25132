pub mod credentials;
pub mod in_memory;
pub mod mock;
pub mod persistence;
pub mod quotes;
