pub mod analysis;
pub mod category;
pub mod destination;
pub mod event;
pub mod matcher;
pub mod task;
