//! Shared application state.

use gembalance_core::{Dispatcher, KeyPool};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::scheduler::SchedulerHandle;

#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub pool: Arc<KeyPool>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub config: ServerConfig,
    pub scheduler: SchedulerHandle,
}

impl AppState {
    pub fn new(
        pool: Arc<KeyPool>,
        dispatcher: Arc<dyn Dispatcher>,
        config: ServerConfig,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self { inner: Arc::new(AppStateInner { pool, dispatcher, config, scheduler }) }
    }

    pub fn pool(&self) -> &KeyPool {
        &self.inner.pool
    }

    pub fn dispatcher(&self) -> &dyn Dispatcher {
        self.inner.dispatcher.as_ref()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }
}
