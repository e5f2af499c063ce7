//! Progress bookkeeping for a single transfer job.
//!
//! Both types are job-local: they live on the transfer's stack and die with
//! it, so no shared per-task throttling table exists.

mod speed;
mod throttle;

pub use speed::SpeedMeter;
pub use throttle::PersistThrottle;
