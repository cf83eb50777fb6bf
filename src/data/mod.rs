//! Detection data: typed records, loading, and the enrichment join.

mod diet;
mod enrich;
mod loader;
mod reference;
mod store;
mod types;

pub use diet::{DietMap, load_diet_map, save_diet_map, set_diet};
pub use enrich::enrich;
pub use loader::load_detections;
pub use reference::{ReferenceRow, ReferenceTable, UpsertAction};
pub use store::{DataStore, Dataset};
pub use types::{
    Detection, Season, SpeciesMeta, TimeBucket, TimeFeatures, parse_timestamp,
};
