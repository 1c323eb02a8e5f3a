use std::sync::Arc;

use skillswap_db::Database;
use skillswap_gateway::dispatcher::Dispatcher;
use skillswap_providers::Providers;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub providers: Providers,
    pub jwt_secret: String,
}
