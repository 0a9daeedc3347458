use crate::infrastructure::activity_log::ActivityLog;
use crate::infrastructure::config::{
    ClientConfig, ensure_default_configs, load_client_config, parse_base_url,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::key_value_store::SqliteKeyValueStore;
use crate::infrastructure::session_api::ReqwestSessionApiClient;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DATABASE_FILE: &str = "client.sqlite";

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join(DATABASE_FILE);

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let _ = load_client_config(&config_dir)?;
    SqliteKeyValueStore::initialize(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        database_path,
    })
}

/// Shared handles for one workspace: configuration, the local store, the
/// activity log and the session service client.
pub struct ClientContext {
    pub config: ClientConfig,
    pub store: Arc<SqliteKeyValueStore>,
    pub log: Arc<ActivityLog>,
    pub api: Arc<ReqwestSessionApiClient>,
}

impl ClientContext {
    /// `base_url` overrides both the config file and the environment.
    pub fn new(workspace_root: &Path, base_url: Option<&str>) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        let mut config = load_client_config(&bootstrap.config_dir)?;
        if let Some(raw) = base_url {
            config.base_url = parse_base_url(raw)?;
        }

        let log = Arc::new(ActivityLog::new(&bootstrap.logs_dir));
        let store = Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
        let api = Arc::new(ReqwestSessionApiClient::with_timeout(
            config.base_url.clone(),
            config.request_timeout_ms,
        )?);
        log.log_info(
            "bootstrap",
            &format!(
                "workspace={} base_url={}",
                bootstrap.workspace_root.display(),
                config.base_url
            ),
        );

        Ok(Self {
            config,
            store,
            log,
            api,
        })
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log.log_error(command, &error.to_string());
        error.to_string()
    }
}
