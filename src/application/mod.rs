// Application layer - datasource operations and annotation aggregation
pub mod annotations_service;
pub mod collaborators;
pub mod datasource;
pub mod lookup_cache;
pub mod reconciler;
pub mod translator;
pub mod tsdb_backend;
