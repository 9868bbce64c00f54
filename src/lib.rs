pub mod config;
pub mod history;
pub mod history_view;
pub mod insights_store;
pub mod logging;
pub mod model;
pub mod payload;
pub mod position_change;
pub mod roster_report;
pub mod snapshot_cache;
pub mod stat_record;
pub mod stat_schema;
pub mod timeline;
