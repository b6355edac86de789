use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::env::TargetEnv;
use crate::error::Error;
use crate::model::{EnvMap, Entry, LoadReport, into_map};
use crate::parser::parse_entries_with_source;

const DEFAULT_FILE: &str = ".env";
const ENV_EXTENSION: &str = ".env";

/// Read and merge dotenv files without touching the process environment.
///
/// Files are parsed independently; a later file overrides keys from earlier
/// ones but cannot reference their values.
pub fn read<I, P>(paths: I) -> Result<EnvMap, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    EnvLoader::new().paths(paths).read()
}

/// Read dotenv files and write every entry into the process environment.
///
/// # Safety
///
/// Mutates the process environment; see [`TargetEnv::process`].
pub unsafe fn load<I, P>(paths: I) -> Result<LoadReport, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    // SAFETY: forwarded to the caller.
    let target = unsafe { TargetEnv::process() };
    EnvLoader::new().paths(paths).target(target).load()
}

/// Load `.env` from the current working directory into the process
/// environment.
///
/// # Safety
///
/// Mutates the process environment; see [`TargetEnv::process`].
pub unsafe fn dotenv() -> Result<LoadReport, Error> {
    // SAFETY: forwarded to the caller.
    unsafe { load([DEFAULT_FILE]) }
}

/// Builder-style dotenv loader.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    paths: Vec<PathBuf>,
    override_existing: bool,
    required: bool,
    target: TargetEnv,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.paths
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
        self
    }

    /// Replace values already present in the target. Enabled by default.
    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    /// Fail on missing files. When disabled, missing files are skipped.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn target(mut self, target: TargetEnv) -> Self {
        self.target = target;
        self
    }

    pub fn target_env(&self) -> &TargetEnv {
        &self.target
    }

    pub fn into_target(self) -> TargetEnv {
        self.target
    }

    /// Parse every configured file and return the merged entries.
    pub fn entries(&self) -> Result<Vec<Entry>, Error> {
        self.collect_entries().map(|(entries, _)| entries)
    }

    /// Parse every configured file and return the merged map.
    pub fn read(&self) -> Result<EnvMap, Error> {
        self.entries().map(into_map)
    }

    /// Parse every configured file and write the result into the target.
    ///
    /// Stops at the first entry the target refuses.
    pub fn load(&mut self) -> Result<LoadReport, Error> {
        let (entries, files_read) = self.collect_entries()?;
        let mut report = LoadReport {
            files_read,
            ..LoadReport::default()
        };

        for entry in entries {
            if !self.override_existing && self.target.contains_key(&entry.key) {
                report.skipped_existing += 1;
                debug!(key = %entry.key, "skipping existing key");
                continue;
            }

            self.target.set_var(&entry.key, &entry.value)?;
            trace!(key = %entry.key, line = entry.line, "applied variable");
            report.loaded += 1;
        }

        Ok(report)
    }

    fn collect_entries(&self) -> Result<(Vec<Entry>, usize), Error> {
        let mut merged_entries = Vec::new();
        let mut by_key = HashMap::<String, usize>::new();
        let mut files_read = 0usize;

        for path in self.effective_paths() {
            let Some(parsed) = self.read_file(&path)? else {
                continue;
            };
            files_read += 1;

            for entry in parsed {
                if let Some(existing_idx) = by_key.get(&entry.key).copied() {
                    merged_entries[existing_idx] = entry;
                } else {
                    by_key.insert(entry.key.clone(), merged_entries.len());
                    merged_entries.push(entry);
                }
            }
        }

        Ok((merged_entries, files_read))
    }

    fn read_file(&self, path: &Path) -> Result<Option<Vec<Entry>>, Error> {
        if !has_env_extension(path) {
            return Err(Error::InvalidFileExtension {
                path: path.to_path_buf(),
            });
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound && !self.required => {
                debug!(path = %path.display(), "skipping missing env file");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), "reading env file");
        let entries = parse_entries_with_source(BufReader::new(file).lines(), None, Some(path))?;
        debug!(path = %path.display(), entries = entries.len(), "parsed env file");
        Ok(Some(entries))
    }

    fn effective_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(DEFAULT_FILE)]
        } else {
            self.paths.clone()
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            override_existing: true,
            required: true,
            target: TargetEnv::memory(),
        }
    }
}

/// `.env` and `app.env` qualify; `.env.local` does not.
fn has_env_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(ENV_EXTENSION))
}
