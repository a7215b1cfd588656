//! Analytical views over e-commerce order tables.
//!
//! A [`RecordTable`] is loaded once with [`source::load`], time attributes
//! are derived from it on demand, and [`views::assemble`] turns it into the
//! labelled [`Bundle`] behind one display tab.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod error_display;
pub mod render;
pub mod source;
pub mod statistics;
pub mod table;
pub mod time;
pub mod views;

pub use config::{AppConfig, ConfigManager};
pub use error::{DataSourceError, Error, InsufficientDataError, Result, TimestampParseError};
pub use shoplens_cli::{Args, CompressionFormat, FileFormat, OutputFormat, ViewName};
pub use source::{load, OpenOptions};
pub use table::RecordTable;
pub use time::NegativeDeliveryPolicy;
pub use views::{assemble, Bundle, ViewItem, ViewSettings};

/// Application name, used for the config directory
pub const APP_NAME: &str = "shoplens";
