use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::store::{CollectionKey, FeeStore, SqliteStorage, SubscriptionId};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub store: Option<FeeStore<SqliteStorage>>,
    /// Keys written while handling the current request, filled by the store subscription.
    pub changed: Rc<RefCell<Vec<CollectionKey>>>,
    subscription: Option<SubscriptionId>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            store: None,
            changed: Rc::new(RefCell::new(Vec::new())),
            subscription: None,
        }
    }

    /// Open (or create) the workspace database and make it the active store.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        self.close_workspace();

        let conn = db::open_db(path)?;
        let mut store = FeeStore::new(SqliteStorage::new(conn));
        let changed = Rc::clone(&self.changed);
        let subscription = store.subscribe(move |key| changed.borrow_mut().push(key));

        if self.config.seed_on_open {
            store.initialize()?;
        }

        info!(workspace = %path.display(), "workspace opened");
        self.workspace = Some(path.to_path_buf());
        self.store = Some(store);
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Take the active store out of the state. Its writes no longer reach `changed`.
    pub fn detach_store(&mut self) -> Option<FeeStore<SqliteStorage>> {
        let mut store = self.store.take()?;
        if let Some(id) = self.subscription.take() {
            store.unsubscribe(id);
        }
        Some(store)
    }

    pub fn close_workspace(&mut self) -> bool {
        let was_open = self.detach_store().is_some();
        if was_open {
            info!("workspace closed");
        }
        self.workspace = None;
        was_open
    }
}
