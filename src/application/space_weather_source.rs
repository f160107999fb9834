// Source trait for space weather series
use crate::application::errors::FetchError;
use crate::domain::space_weather::{DataSourceKind, SeriesPoint};
use async_trait::async_trait;

#[async_trait]
pub trait SpaceWeatherSource: Send + Sync {
    /// Fetch at most `limit` of the most recent points of `source`, oldest first.
    async fn fetch(
        &self,
        source: DataSourceKind,
        limit: usize,
    ) -> Result<Vec<SeriesPoint>, FetchError>;
}
