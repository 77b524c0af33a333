#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
pub mod complex;
pub mod grid;
pub mod kernel;
pub mod pipeline;
pub mod types;
