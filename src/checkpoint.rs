//! Checkpoint persistence for network parameters
//!
//! Parameters are serialized with libtorch's own stream format and handed to
//! a [`CheckpointStore`] as opaque bytes, keyed by a checkpoint name (one
//! per network role) and the identifier of the agent that owns it.
//!
//! A missing checkpoint is a normal cold start, reported as
//! [`LoadOutcome::NotFound`] rather than an error.

use std::{
    collections::HashMap,
    fmt, fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use tch::nn::VarStore;

use crate::error::Result;

/// File extension used by [`DirectoryStore`]
pub const CHECKPOINT_EXTENSION: &str = "ot";

/// Identifies one network of one agent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckpointKey {
    /// Network role, e.g. `actor_torch_ppo`
    pub name: String,

    /// Owning agent
    pub agent_id: String,
}

impl CheckpointKey {
    /// Create a key
    pub fn new(name: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self { name: name.into(), agent_id: agent_id.into() }
    }

    /// `{name}_{agent_id}.ot`
    pub fn file_name(&self) -> String {
        format!("{}_{}.{CHECKPOINT_EXTENSION}", self.name, self.agent_id)
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.agent_id)
    }
}

/// Result of attempting to restore parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Parameters were replaced by the stored ones
    Loaded,

    /// Nothing stored under the key; parameters are unchanged
    NotFound,
}

/// Byte-level storage for checkpoints
pub trait CheckpointStore {
    /// Store `bytes` under `key`, replacing any previous value
    fn save(&mut self, key: &CheckpointKey, bytes: &[u8]) -> Result<()>;

    /// Fetch the bytes stored under `key`, or `None` if there are none
    fn load(&self, key: &CheckpointKey) -> Result<Option<Vec<u8>>>;
}

/// Checkpoints as files in one directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Use `dir`; it is created on the first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Checkpoint directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the file backing `key`
    pub fn path_for(&self, key: &CheckpointKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl CheckpointStore for DirectoryStore {
    fn save(&mut self, key: &CheckpointKey, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), bytes)?;
        Ok(())
    }

    fn load(&self, key: &CheckpointKey) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process checkpoint storage, mainly for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<CheckpointKey, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored checkpoints
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been saved
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether `key` has been saved
    pub fn contains(&self, key: &CheckpointKey) -> bool {
        self.entries.contains_key(key)
    }
}

impl CheckpointStore for MemoryStore {
    fn save(&mut self, key: &CheckpointKey, bytes: &[u8]) -> Result<()> {
        self.entries.insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, key: &CheckpointKey) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }
}

/// Serialize every variable of `vs` and store it under `key`
pub fn save_var_store(
    store: &mut dyn CheckpointStore,
    key: &CheckpointKey,
    vs: &VarStore,
) -> Result<()> {
    let mut bytes = Vec::new();
    vs.save_to_stream(&mut bytes)?;
    store.save(key, &bytes)?;
    tracing::info!(checkpoint = %key, bytes = bytes.len(), "Saved checkpoint");
    Ok(())
}

/// Restore the variables of `vs` from the bytes stored under `key`
///
/// On [`LoadOutcome::NotFound`] the variables keep their current values.
pub fn load_var_store(
    store: &dyn CheckpointStore,
    key: &CheckpointKey,
    vs: &mut VarStore,
) -> Result<LoadOutcome> {
    let Some(bytes) = store.load(key)? else {
        tracing::info!(checkpoint = %key, "No checkpoint found, keeping fresh parameters");
        return Ok(LoadOutcome::NotFound);
    };

    vs.load_from_stream(Cursor::new(bytes))?;
    tracing::info!(checkpoint = %key, "Loaded checkpoint");
    Ok(LoadOutcome::Loaded)
}
