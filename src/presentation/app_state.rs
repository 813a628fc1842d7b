// Application state for HTTP handlers
use crate::application::pipeline_service::PipelineHandle;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineHandle,
}
