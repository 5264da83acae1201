// OpenTSDB datasource: query translation, result reconciliation, lookups and annotations
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

#[cfg(test)]
pub(crate) mod test_support;
