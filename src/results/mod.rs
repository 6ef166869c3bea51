mod result_set;
mod row;

pub use result_set::Rows;
pub use row::Row;
