//! Session management
//!
//! A session is one run of an executable. Each session gets its own directory
//! under the software root holding the log file, the CSV archives and a copy
//! of the parameter files the run was flown with.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Timestamp format of session directory names, see `chrono::format::strftime`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the archive directory within a session.
const ARCH_DIR: &str = "arch";

/// Name of the parameter snapshot directory within a session.
const PARAMS_DIR: &str = "params";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Paths belonging to the current session
#[derive(Clone, Debug)]
pub struct Session {
    pub session_root: PathBuf,

    /// CSV archives are written under here
    pub arch_root: PathBuf,

    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (WPNAV_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started in this process ({0})")]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot snapshot the parameter file {0:?}: {1}")]
    CannotSnapshotParams(PathBuf, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory of the software root.
    ///
    /// The session directory is named `{exec_name}_{timestamp}`.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let sessions_path = crate::host::get_wpnav_sw_root()
            .map_err(|_| SessionError::SwRootNotSet)?
            .join(sessions_dir);

        Self::new_in(exec_name, sessions_path)
    }

    /// Start a new session inside an explicit directory.
    pub fn new_in(exec_name: &str, sessions_path: PathBuf) -> Result<Self, SessionError> {
        SESSION_EPOCH.try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        let timestamp = get_epoch()
            .map(|e| e.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();

        let session_root = sessions_path.join(format!("{}_{}", exec_name, timestamp));
        let arch_root = session_root.join(ARCH_DIR);

        fs::create_dir_all(&arch_root).map_err(SessionError::CannotCreateDir)?;

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
            arch_root,
        })
    }

    /// Copy the given parameter files into the session, so the run can be
    /// reproduced after the files in the software root change.
    ///
    /// Paths are relative to the `params` directory of the software root.
    pub fn snapshot_params(&self, param_files: &[&str]) -> Result<(), SessionError> {
        let params_root = crate::host::get_wpnav_sw_root()
            .map_err(|_| SessionError::SwRootNotSet)?
            .join("params");

        self.snapshot_params_from(&params_root, param_files)
    }

    /// Copy parameter files from an explicit directory into the session.
    pub fn snapshot_params_from<P: AsRef<Path>>(
        &self,
        params_root: P,
        param_files: &[&str]
    ) -> Result<(), SessionError> {
        let dest_root = self.session_root.join(PARAMS_DIR);
        fs::create_dir_all(&dest_root).map_err(SessionError::CannotCreateDir)?;

        for file in param_files {
            let src = params_root.as_ref().join(file);
            fs::copy(&src, dest_root.join(file))
                .map_err(|e| SessionError::CannotSnapshotParams(src.clone(), e))?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds elapsed since the start of the session, zero before a session
/// has started.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => time::duration_to_seconds(Utc::now() - *e).unwrap_or(std::f64::NAN),
        None => 0.0,
    }
}

/// The session's epoch, `None` before a session has started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

#[cfg(test)]
mod test {
    use super::*;

    // The epoch is process wide so everything needing a session is in one
    // test
    #[test]
    fn test_session() {
        let dir = tempfile::tempdir().unwrap();

        let session = Session::new_in("test_exec", dir.path().to_path_buf()).unwrap();

        assert!(session.session_root.starts_with(dir.path()));
        assert!(session.arch_root.is_dir());
        assert_eq!(
            session.log_file_path.file_name().and_then(|f| f.to_str()),
            Some("test_exec.log")
        );
        assert!(get_elapsed_seconds() >= 0.0);
        assert!(get_epoch().is_some());

        // Parameter snapshot
        let params_dir = tempfile::tempdir().unwrap();
        fs::write(params_dir.path().join("a.toml"), "x = 1\n").unwrap();
        session.snapshot_params_from(params_dir.path(), &["a.toml"]).unwrap();
        assert_eq!(
            fs::read_to_string(session.session_root.join("params").join("a.toml")).unwrap(),
            "x = 1\n"
        );
        match session.snapshot_params_from(params_dir.path(), &["missing.toml"]) {
            Err(SessionError::CannotSnapshotParams(..)) => (),
            r => panic!("Expected a snapshot error, got {:?}", r)
        }

        // The epoch can only be set once per process
        match Session::new_in("test_exec", dir.path().to_path_buf()) {
            Err(SessionError::CannotInitEpoch(_)) => (),
            r => panic!("Expected the epoch to already be set, got {:?}", r)
        }
    }
}
