mod default_filters;

pub use default_filters::{DefaultFilters, DefaultFiltersConfiguration, DefaultFiltersError, NoDefaultFilters, StaticDefaultFilters};
