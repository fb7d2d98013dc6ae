use std::sync::Arc;

use crate::aggregate::Aggregator;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}
