pub mod backup_restore;
pub mod core;
pub mod logs;
pub mod records;
