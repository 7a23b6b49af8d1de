pub mod collector;
pub mod records;
pub mod registry;
pub mod scheduler;
pub mod shutdown;

pub use crate::domain::model::{CollectOutcome, FetchRequest, JobSpec, Point, Record};
pub use crate::domain::ports::{Clock, PointWriter, ZoneParser};
pub use crate::utils::error::Result;
