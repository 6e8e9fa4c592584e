//! # saasbridge-smartsheet
//!
//! Smartsheet sheets and rows as platform collections.
//!
//! - [`SmartsheetAdapter::load_sheets`] lists sheets, or fetches one sheet
//!   with its columns.
//! - [`SmartsheetAdapter::load_rows`] reads one page of a sheet with one row
//!   of lookahead (`pageSize = batchSize + 1`), optionally restricted to
//!   specific row ids.
//! - [`SmartsheetAdapter::save_rows`] writes through the collection's
//!   [`SheetMapping`], spreading MAP fields across several columns.

mod adapter;
mod mapping;
mod rows;

pub use adapter::{SmartsheetAdapter, DEFAULT_BASE_URL, SHEET_COLUMNS_FIELD, SHEET_NAME_FIELD};
pub use mapping::{
    ColumnMapping, MappingLookup, MappingSet, SheetMapping, MAPPING_FIELDS_FIELD,
    MAPPING_SHEET_FIELD,
};
pub use rows::{record_to_cells, row_to_record};

pub use saasbridge_core::{Error, ErrorKind, Result};
