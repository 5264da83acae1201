// Domain layer - wire types and pure algorithms
pub mod annotation;
pub mod intersect;
pub mod label;
pub mod query;
pub mod series;
