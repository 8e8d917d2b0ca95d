use std::env;
use std::fs;
use std::path::PathBuf;

/// Filesystem locations the backend reads and writes.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub log_dir: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let log_dir = project_root.join("logs");
        let config_path = config_path(&project_root);

        let _ = fs::create_dir_all(&log_dir);

        AppPaths {
            project_root,
            log_dir,
            config_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("EVERSTORM_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn config_path(project_root: &std::path::Path) -> PathBuf {
    if let Ok(path) = env::var("EVERSTORM_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    project_root.join("config.yml")
}
