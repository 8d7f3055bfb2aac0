// File I/O: count sheets in, catalogs in and out, summaries out

pub mod catalog;
pub mod csv;
pub mod export;
pub mod sheet;
pub mod xlsx;
