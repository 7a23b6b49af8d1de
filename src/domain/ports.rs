use crate::domain::model::{DataType, Point, Record};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of grid data for one zone (or one exchange pair).
#[async_trait]
pub trait ZoneParser: Send + Sync {
    async fn fetch(
        &self,
        args: &[String],
        data_type: DataType,
        target_datetime: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>>;
}

#[async_trait]
pub trait PointWriter: Send + Sync {
    async fn write_points(&self, points: &[Point]) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
