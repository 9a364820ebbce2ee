pub mod report_builder;

pub use report_builder::*;
