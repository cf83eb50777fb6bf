//! Filter state and the ordered filter pipeline.

mod comparison;
mod pipeline;
mod state;

pub use comparison::{ComparisonMode, Panel, month_label};
pub use pipeline::{FilteredSet, apply, in_month, in_season, is_excluded_status};
pub use state::{DateRange, FilterState, YearSelection};
