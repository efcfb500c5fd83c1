pub mod console;
pub mod serialize;
