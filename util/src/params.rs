//! Parameter file loading
//!
//! Parameter files are TOML documents stored in the `params` directory under the software root
//! (see [`crate::host::get_sw_root`]). Each module defines its own `Params` struct deriving
//! `serde::Deserialize`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (DRIVE_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parameter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file {0:?}: {1}")]
    DeserialiseError(PathBuf, toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file.
///
/// The file path is relative to the `$DRIVE_SW_ROOT/params` directory.
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let mut path = crate::host::get_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    load_from(&path)
}

/// Load a parameter file from an explicit path.
pub fn load_from<P>(path: &Path) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let params_str =
        read_to_string(path).map_err(|e| LoadError::FileLoadError(path.to_path_buf(), e))?;

    from_str(&params_str).map_err(|e| match e {
        LoadError::DeserialiseError(_, e) => LoadError::DeserialiseError(path.to_path_buf(), e),
        other => other,
    })
}

/// Parse parameters from an in-memory TOML string.
pub fn from_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    toml::from_str(params_str).map_err(|e| LoadError::DeserialiseError(PathBuf::new(), e))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct TestParams {
        gain: f64,
        limits: (f64, f64),
        #[serde(default)]
        enabled: bool,
    }

    #[test]
    fn test_from_str() {
        let p: TestParams = from_str("gain = 0.8\nlimits = [-1.0, 1.0]\n").unwrap();

        assert_eq!(p.gain, 0.8);
        assert_eq!(p.limits, (-1.0, 1.0));
        assert!(!p.enabled);
    }

    #[test]
    fn test_from_str_invalid() {
        let r: Result<TestParams, _> = from_str("gain = \"fast\"\n");

        assert!(matches!(r, Err(LoadError::DeserialiseError(_, _))));
    }

    #[test]
    fn test_load_from_missing_file() {
        let r: Result<TestParams, _> = load_from(Path::new("/this/path/does/not/exist.toml"));

        assert!(matches!(r, Err(LoadError::FileLoadError(_, _))));
    }
}
