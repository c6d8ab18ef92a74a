use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::Config;
use crate::rabbitmq::MessagingGateway;
use crate::user_service::UserStore;

/// Shared application context handed to every HTTP handler
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub gateway: Arc<MessagingGateway>,
    pub auth_manager: Arc<AuthManager>,
    pub user_store: Arc<dyn UserStore>,
}

impl AppContext {
    pub fn new(
        config: Arc<Config>,
        gateway: Arc<MessagingGateway>,
        auth_manager: Arc<AuthManager>,
        user_store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            config,
            gateway,
            auth_manager,
            user_store,
        }
    }
}
