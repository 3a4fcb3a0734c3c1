pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod schedule;
pub mod table;

pub use api::DashboardClient;
pub use error::{ApiError, ProbeError, ValidationError};
pub use health::{HealthAggregator, HealthSummary, OverallHealth};
pub use schedule::FormSession;
pub use table::{DisplayGrid, TablePresenter, TableSpec};
