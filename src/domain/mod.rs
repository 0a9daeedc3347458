use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod countdown;
pub mod models;
pub mod toast;
pub mod view;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
