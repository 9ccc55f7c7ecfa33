pub mod client;
pub mod file;
pub mod persona;
pub mod system;
