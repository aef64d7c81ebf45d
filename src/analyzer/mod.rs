pub mod aggregate;
pub mod dashboard;
pub mod filter;
pub mod selection;
pub mod stats;
pub mod temporal;

pub use aggregate::{category_counts, time_bucket, top_n, TopN};
pub use dashboard::{build_dashboard, DashboardRequest, DashboardView, NoDataReason, Panel};
pub use filter::{filter_tickets, CategoryFilter};
pub use selection::{reconcile, SelectionState};
pub use temporal::{resolve, DateInterval, FilterMode, Granularity};
