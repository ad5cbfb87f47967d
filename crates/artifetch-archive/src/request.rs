//! Argument construction for the `artifacts` and `lkg` tools.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use artifetch_core::BuildId;

/// One batched transfer: everything listed in `manifest`, copied from
/// `build_id` into `destination`.
///
/// Built fresh per fetch and dropped once the fetch completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Build to copy from.
    pub build_id: BuildId,
    /// Local directory to copy into.
    pub destination: PathBuf,
    /// Newline-delimited list of artifact paths.
    pub manifest: PathBuf,
    /// Resolve paths from the store root instead of the build root.
    pub from_root: bool,
}

impl FetchRequest {
    /// `cp -build <id> -dst <dir> -srcs-file <manifest> [-root]`
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "cp".into(),
            "-build".into(),
            self.build_id.as_str().into(),
            "-dst".into(),
            self.destination.clone().into_os_string(),
            "-srcs-file".into(),
            self.manifest.clone().into_os_string(),
        ];
        if self.from_root {
            args.push("-root".into());
        }
        args
    }
}

/// `ls -build <id>`
pub fn list_args(build_id: &BuildId) -> Vec<OsString> {
    vec!["ls".into(), "-build".into(), build_id.as_str().into()]
}

/// `build -builder <name>`
pub fn latest_build_args(builder: &str) -> Vec<OsString> {
    vec!["build".into(), "-builder".into(), builder.into()]
}

/// Value following `flag` in `args`, if any.
pub(crate) fn flag_value<'a>(args: &'a [OsString], flag: &str) -> Option<&'a Path> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(Path::new)
}
