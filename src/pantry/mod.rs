pub mod cookable;
pub mod stock;
pub mod watcher;
