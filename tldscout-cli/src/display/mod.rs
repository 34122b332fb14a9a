mod human;
mod progress;

pub use human::HumanFormatter;
pub use progress::{BatchProgress, ProgressWriterFactory};
