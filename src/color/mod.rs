pub mod lab;
pub mod palette;
