pub mod audit;
pub mod properties;
pub mod up;

pub use audit::AuditOptions;
pub use up::UpOptions;
