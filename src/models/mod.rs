pub mod labels;
pub mod schedule;
