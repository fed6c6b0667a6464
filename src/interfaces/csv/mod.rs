//! CSV import of staff status updates and export of their outcomes.

pub mod outcome_writer;
pub mod update_reader;
