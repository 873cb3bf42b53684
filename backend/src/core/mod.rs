//! Clock and filesystem layout shared by every instance

pub mod time;
pub mod workspace;
