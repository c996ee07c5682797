pub mod dump;
pub mod list;

pub use dump::run as dump;
pub use list::run as list;
