//! Data models for Groundcheck

pub mod checklist;
pub mod device;
pub mod history;
pub mod incident;
pub mod inspection_log;
pub mod kpi;
pub mod maintenance;
pub mod material;
pub mod status;
pub mod timestamp;
pub mod user;

// Re-export commonly used types
pub use checklist::{ChecklistItem, IssueRef};
pub use device::{Category, Device};
pub use history::HistoryItem;
pub use incident::Incident;
pub use inspection_log::InspectionLog;
pub use maintenance::MaintenanceTask;
pub use material::MaterialHistory;
pub use status::Status;
pub use user::{User, UserClaims};
