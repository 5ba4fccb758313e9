use std::sync::Arc;

use application::{ConnectionRegistry, HistoryService, MessageRouter, UserService};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub history_service: Arc<HistoryService>,
    pub message_router: Arc<MessageRouter>,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        history_service: Arc<HistoryService>,
        message_router: Arc<MessageRouter>,
    ) -> Self {
        Self {
            user_service,
            history_service,
            message_router,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.message_router.registry()
    }
}
