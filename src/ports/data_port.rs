//! Price data access port trait.

use crate::domain::error::StocksageError;
use crate::domain::ohlcv::InstrumentSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Sessions of `code` with `start_date <= date <= end_date`, ascending.
    fn fetch_series(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<InstrumentSeries, StocksageError>;

    fn list_codes(&self) -> Result<Vec<String>, StocksageError>;
}
