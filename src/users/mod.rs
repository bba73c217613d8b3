pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;
