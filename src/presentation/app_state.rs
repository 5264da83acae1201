// Application state for HTTP handlers
use crate::application::annotations_service::AnnotationsService;
use crate::application::datasource::OpenTsdbDatasource;
use crate::infrastructure::alert_log::AlertLog;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub datasource: Arc<OpenTsdbDatasource>,
    pub annotations: Arc<AnnotationsService>,
    pub alerts: Arc<AlertLog>,
}
