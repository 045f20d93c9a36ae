use common::starter::StarterService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: StarterService,
}

impl AppState {
    pub fn new(service: StarterService) -> Self {
        Self { service }
    }
}
