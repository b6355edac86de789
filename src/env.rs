use crate::error::Error;
use crate::model::EnvMap;

/// Destination for loaded environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEnv {
    kind: TargetEnvKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetEnvKind {
    /// Apply entries to the current process environment.
    ///
    /// This writes through [`std::env::set_var`], which mutates global process
    /// state and is not thread-safe for concurrent environment access.
    Process,
    /// Apply entries to an in-memory map.
    Memory(EnvMap),
}

impl Default for TargetEnv {
    fn default() -> Self {
        Self::memory()
    }
}

impl TargetEnv {
    /// Create a process-environment target.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other threads concurrently read or write the
    /// process environment for the duration of operations that may mutate this
    /// target.
    pub unsafe fn process() -> Self {
        Self {
            kind: TargetEnvKind::Process,
        }
    }

    /// Create an in-memory environment target.
    ///
    /// Use this to avoid mutating the process environment.
    pub fn memory() -> Self {
        Self::from_memory(EnvMap::new())
    }

    /// Create an in-memory environment target from an existing map.
    pub fn from_memory(map: EnvMap) -> Self {
        Self {
            kind: TargetEnvKind::Memory(map),
        }
    }

    pub fn is_process(&self) -> bool {
        matches!(self.kind, TargetEnvKind::Process)
    }

    pub fn as_memory(&self) -> Option<&EnvMap> {
        match &self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub fn into_memory(self) -> Option<EnvMap> {
        match self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        match &self.kind {
            TargetEnvKind::Process => std::env::var_os(key).is_some(),
            TargetEnvKind::Memory(map) => map.contains_key(key),
        }
    }

    /// Write one variable. Inputs the platform would reject fail with
    /// [`Error::Apply`] instead of panicking inside `set_var`.
    pub(crate) fn set_var(&mut self, key: &str, value: &str) -> Result<(), Error> {
        check_writable(key, value)?;
        match &mut self.kind {
            TargetEnvKind::Process => {
                // SAFETY: `TargetEnv::process` is unsafe and its caller
                // guarantees exclusive access to the process environment.
                unsafe { std::env::set_var(key, value) }
            }
            TargetEnvKind::Memory(map) => {
                map.insert(key.to_owned(), value.to_owned());
            }
        }
        Ok(())
    }
}

fn check_writable(key: &str, value: &str) -> Result<(), Error> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.contains('=') {
        "key contains `=`"
    } else if key.contains('\0') {
        "key contains a NUL byte"
    } else if value.contains('\0') {
        "value contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(Error::Apply {
        key: key.to_owned(),
        reason,
    })
}
