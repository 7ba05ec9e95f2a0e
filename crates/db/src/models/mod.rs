pub mod report;
pub mod tour;
