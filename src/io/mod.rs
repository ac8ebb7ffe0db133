/// CSV export of production series.
pub mod export;
