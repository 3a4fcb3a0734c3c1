mod format;
mod presenter;

pub use format::{format_timestamp, is_timestamp_column, parse_timestamp, truncate, ELLIPSIS, NULL_PLACEHOLDER};
pub use presenter::{
    CellDisplay, DisplayCell, DisplayGrid, RowShape, TableFooter, TablePresenter, TableSpec, DEFAULT_TRUNCATE_AT,
};
