pub mod error;
pub mod model;
pub mod names;
pub mod query;
pub mod results;
pub mod sparql;
