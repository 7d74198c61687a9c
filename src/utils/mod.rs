pub mod logging;
pub mod percentage;
pub mod time;
