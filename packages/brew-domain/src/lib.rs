mod catalog;
mod constraints;
mod context;
mod error;

pub use catalog::{Catalog, CatalogItem, Category, Temperature};
pub use constraints::{Constraints, LOW_CALORIE_LIMIT};
pub use context::{NEUTRAL_CONTEXT_MATCH, RequestContext, TimeOfDay, Weather, context_match};
pub use error::{Error, Result};
