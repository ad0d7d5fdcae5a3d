mod day;
mod habit;
mod user;

pub use day::*;
pub use habit::*;
pub use user::*;
