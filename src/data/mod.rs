//! Table storage
//!
//! Columnar frames backed by parquet files

mod frame;
mod parquet;

pub use self::frame::{coerce_numeric, Coerced, Column, ColumnData, Frame};
pub use self::parquet::{read_frame, temp_path, write_frame, StagedWrites};
