pub mod cleaning_report;
pub mod data_cleaner;
pub mod frame_ops;
pub mod rule_normalizer;
pub mod sentiment;
pub mod unit_parser;

pub use cleaning_report::*;
pub use data_cleaner::*;
pub use rule_normalizer::*;
pub use sentiment::*;
pub use unit_parser::*;
