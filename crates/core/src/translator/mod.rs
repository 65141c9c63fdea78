//! Translation: the semantic tree becomes a query plan, query text at the
//! cursor becomes a forecast, and a plan can be written back as text.

pub mod forecast;
pub mod plan;
pub mod render;

pub use forecast::{forecast, Forecast, ForecastContext, Suggestion};
pub use plan::{to_query_plan, ElementGroup, ElementItem, FilterGroup, QueryPlan};
pub use render::to_query_text;
