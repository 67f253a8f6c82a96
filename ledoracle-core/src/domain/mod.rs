//! Domain types: state snapshots, trajectories, recorded series.

pub mod series;
pub mod state;
pub mod trajectory;

pub use series::HistoricalSeries;
pub use state::{keys, State};
pub use trajectory::{SeriesIter, Trajectory, VariableSeries};
