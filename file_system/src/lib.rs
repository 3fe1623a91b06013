use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories_next::ProjectDirs;

const SPOOL_DIR_NAME: &str = "mako-instructions";

/// Returns the default spool root located in the local data dir for the application.
///
/// `None` when the platform has no notion of a home directory.
pub fn get_default_spool_root() -> Option<PathBuf> {
    get_project_dirs().map(|dirs| dirs.data_local_dir().join(SPOOL_DIR_NAME))
}

/// Creates the spool root and all missing parents. Succeeds when it already exists.
pub fn ensure_spool_root(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "manta", "gc-instruction-writer")
}
