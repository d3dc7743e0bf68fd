//! Domain records for field inspections.
//!
//! Jobs own windows and windows own photos. The records reference their
//! owner by ID (`Window::job_id`, `Photo::window_id`) rather than holding
//! pointers, and the [`store`](crate::store) keeps them in separate tables.

mod ids;
mod job;
mod photo;
mod window;

pub use ids::{JobId, PhotoId, WindowId};
pub use job::{Address, Environment, Job, JobStatus, OverheadImage};
pub use photo::{Photo, PhotoCounts, PhotoType};
pub use window::{TestResult, Window, WindowType, MAX_LEAK_POINTS};
