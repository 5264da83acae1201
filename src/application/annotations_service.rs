// Annotation aggregation - fan out to every enabled source once per refresh cycle
use crate::application::collaborators::{AlertSink, Severity};
use crate::domain::annotation::{Annotation, AnnotationEvent, AnnotationSource, Dashboard};
use crate::domain::query::RawTimeRange;
use crate::error::{DatasourceError, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A datasource able to answer annotation queries.
#[async_trait]
pub trait AnnotationDatasource: Send + Sync {
    async fn annotation_query(
        &self,
        source: &AnnotationSource,
        range: &RawTimeRange,
    ) -> Result<Vec<AnnotationEvent>>;
}

/// Resolves an annotation source's datasource reference.
pub trait DatasourceRegistry: Send + Sync {
    /// `None` selects the default datasource.
    fn get(&self, name: Option<&str>) -> Result<Arc<dyn AnnotationDatasource>>;
}

pub struct StaticRegistry {
    default: String,
    datasources: HashMap<String, Arc<dyn AnnotationDatasource>>,
}

impl StaticRegistry {
    pub fn new(default: impl Into<String>, datasource: Arc<dyn AnnotationDatasource>) -> Self {
        let default = default.into();
        let mut datasources = HashMap::new();
        datasources.insert(default.clone(), datasource);
        Self {
            default,
            datasources,
        }
    }

    pub fn register(
        mut self,
        name: impl Into<String>,
        datasource: Arc<dyn AnnotationDatasource>,
    ) -> Self {
        self.datasources.insert(name.into(), datasource);
        self
    }
}

impl DatasourceRegistry for StaticRegistry {
    fn get(&self, name: Option<&str>) -> Result<Arc<dyn AnnotationDatasource>> {
        let name = name.filter(|n| !n.is_empty()).unwrap_or(&self.default);
        self.datasources
            .get(name)
            .cloned()
            .ok_or_else(|| DatasourceError::UnknownDatasource(name.to_string()))
    }
}

type SharedAnnotations = Shared<BoxFuture<'static, Arc<Vec<Annotation>>>>;

/// Collects annotations from all enabled sources.
///
/// The first call in a refresh cycle starts the queries; later calls share the same
/// outcome until [`AnnotationsService::clear_cache`] is signalled.
pub struct AnnotationsService {
    registry: Arc<dyn DatasourceRegistry>,
    alerts: Arc<dyn AlertSink>,
    cached: Mutex<Option<SharedAnnotations>>,
}

impl AnnotationsService {
    pub fn new(registry: Arc<dyn DatasourceRegistry>, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            registry,
            alerts,
            cached: Mutex::new(None),
        }
    }

    /// Handler for the `refresh` and `setup-dashboard` signals.
    pub fn clear_cache(&self) {
        tracing::debug!("Clearing annotation cycle cache");
        *self.cached.lock() = None;
    }

    /// `None` when the dashboard has annotations switched off.
    pub async fn get_annotations(
        &self,
        range: &RawTimeRange,
        dashboard: &Dashboard,
    ) -> Option<Arc<Vec<Annotation>>> {
        if !dashboard.annotations.enable {
            return None;
        }

        let pending = {
            let mut cached = self.cached.lock();
            match cached.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.start_cycle(range, dashboard);
                    *cached = Some(pending.clone());
                    pending
                }
            }
        };

        Some(pending.await)
    }

    fn start_cycle(&self, range: &RawTimeRange, dashboard: &Dashboard) -> SharedAnnotations {
        let sources: Vec<AnnotationSource> = dashboard
            .annotations
            .list
            .iter()
            .filter(|s| s.enable)
            .cloned()
            .collect();
        tracing::debug!("Starting annotation cycle for {} sources", sources.len());

        let timezone = dashboard.timezone;
        let range = range.clone();
        let registry = self.registry.clone();
        let alerts = self.alerts.clone();

        async move {
            let queries = sources.into_iter().map(|source| {
                let registry = registry.clone();
                let alerts = alerts.clone();
                let range = range.clone();
                async move {
                    let result = match registry.get(source.datasource.as_deref()) {
                        Ok(datasource) => datasource.annotation_query(&source, &range).await,
                        Err(e) => Err(e),
                    };

                    match result {
                        Ok(events) => events
                            .into_iter()
                            .map(|event| Annotation::from_event(event, timezone))
                            .collect::<Vec<_>>(),
                        Err(e) => {
                            tracing::warn!("Annotation source {} failed: {}", source.name, e);
                            alerts.set("Annotations error", &e.to_string(), Severity::Error);
                            Vec::new()
                        }
                    }
                }
            });

            let list: Vec<Annotation> = join_all(queries).await.into_iter().flatten().collect();
            Arc::new(list)
        }
        .boxed()
        .shared()
    }
}
