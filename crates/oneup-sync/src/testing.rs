//! In-memory port implementations shared by the unit tests

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use oneup_core::domain::{ByteRange, FileRecord, RelativePath, RemoteId, RemotePath, UploadSession};
use oneup_core::ports::{ChunkOutcome, DeleteOutcome, ICloudProvider, IMetadataStore, RemoteItem};

/// One call observed by [`FakeCloudProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    VerifyAccess,
    Exists(String),
    CreateFolder(String),
    UploadSmall(String),
    CreateSession(String, u64),
    Chunk(String),
    SetTimestamps(String),
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    folders: BTreeSet<RemotePath>,
    files: HashMap<RemotePath, (RemoteId, Vec<u8>)>,
    sessions: HashMap<String, (RemotePath, Vec<u8>)>,
    calls: Vec<Call>,
    next_id: u64,
    fail_uploads: HashSet<RemotePath>,
    fail_folders: HashSet<RemotePath>,
    fail_deletes: HashSet<RemoteId>,
    fail_chunks: HashSet<String>,
    withhold_completion: bool,
    fail_timestamps: bool,
    unreachable: bool,
}

/// Cloud provider keeping folders and files in memory
#[derive(Default)]
pub struct FakeCloudProvider {
    state: Mutex<FakeState>,
}

impl FakeCloudProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(self, path: &str) -> Self {
        self.state.lock().unwrap().folders.insert(remote(path));
        self
    }

    /// Seeds a remote file, returning its id
    pub fn with_file(self, path: &str, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(remote(path), (RemoteId::new(id.to_string()).unwrap(), Vec::new()));
        self
    }

    pub fn fail_upload(&self, path: &str) {
        self.state.lock().unwrap().fail_uploads.insert(remote(path));
    }

    pub fn fail_folder(&self, path: &str) {
        self.state.lock().unwrap().fail_folders.insert(remote(path));
    }

    pub fn fail_delete(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_deletes
            .insert(RemoteId::new(id.to_string()).unwrap());
    }

    /// Rejects the window with this `Content-Range`, e.g. `bytes 4-7/10`
    pub fn fail_chunk(&self, content_range: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_chunks
            .insert(content_range.to_string());
    }

    /// Answers every window with Continue, even the last one
    pub fn withhold_completion(&self) {
        self.state.lock().unwrap().withhold_completion = true;
    }

    pub fn fail_timestamps(&self) {
        self.state.lock().unwrap().fail_timestamps = true;
    }

    pub fn set_unreachable(&self) {
        self.state.lock().unwrap().unreachable = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Calls other than the access check
    pub fn remote_mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::VerifyAccess | Call::Exists(_)))
            .collect()
    }

    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(&remote(path))
            .map(|(_, data)| data.clone())
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(&remote(path))
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.state.lock().unwrap().folders.contains(&remote(path))
    }

    fn store_file(state: &mut FakeState, path: &RemotePath, data: Vec<u8>) -> RemoteItem {
        // A re-upload keeps the item id, like a replace on the real drive
        let id = match state.files.get(path) {
            Some((id, _)) => id.clone(),
            None => {
                state.next_id += 1;
                RemoteId::new(format!("ID{}", state.next_id)).unwrap()
            }
        };
        let size = data.len() as u64;
        state.files.insert(path.clone(), (id.clone(), data));
        RemoteItem {
            id,
            name: path.file_name().unwrap_or_default().to_string(),
            size: Some(size),
        }
    }
}

pub fn remote(path: &str) -> RemotePath {
    RemotePath::new(path.to_string()).unwrap()
}

#[async_trait::async_trait]
impl ICloudProvider for FakeCloudProvider {
    async fn verify_access(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::VerifyAccess);
        if state.unreachable {
            anyhow::bail!("drive unreachable");
        }
        Ok(())
    }

    async fn folder_exists(&self, path: &RemotePath) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Exists(path.to_string()));
        if state.fail_folders.contains(path) {
            anyhow::bail!("existence check failed for {path}");
        }
        Ok(state.folders.contains(path))
    }

    async fn create_folder(&self, path: &RemotePath) -> anyhow::Result<RemoteItem> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateFolder(path.to_string()));
        if let Some(parent) = path.parent() {
            if !parent.is_root() && !state.folders.contains(&parent) {
                anyhow::bail!("parent of {path} does not exist");
            }
        }
        state.folders.insert(path.clone());
        state.next_id += 1;
        Ok(RemoteItem {
            id: RemoteId::new(format!("F{}", state.next_id)).unwrap(),
            name: path.file_name().unwrap_or_default().to_string(),
            size: None,
        })
    }

    async fn upload_small(&self, path: &RemotePath, data: Vec<u8>) -> anyhow::Result<RemoteItem> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UploadSmall(path.to_string()));
        if state.fail_uploads.contains(path) {
            anyhow::bail!("upload rejected for {path}");
        }
        Ok(Self::store_file(&mut state, path, data))
    }

    async fn create_upload_session(
        &self,
        path: &RemotePath,
        total_size: u64,
    ) -> anyhow::Result<UploadSession> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::CreateSession(path.to_string(), total_size));
        if state.fail_uploads.contains(path) {
            anyhow::bail!("session refused for {path}");
        }
        let url = format!("https://upload.test/{}", state.sessions.len() + 1);
        state.sessions.insert(url.clone(), (path.clone(), Vec::new()));
        Ok(UploadSession::new(url, total_size, None))
    }

    async fn upload_chunk(
        &self,
        session: &UploadSession,
        range: ByteRange,
        data: Vec<u8>,
    ) -> anyhow::Result<ChunkOutcome> {
        let mut state = self.state.lock().unwrap();
        let content_range = range.content_range(session.total_size);
        state.calls.push(Call::Chunk(content_range.clone()));
        if state.fail_chunks.contains(&content_range) {
            anyhow::bail!("window {content_range} rejected");
        }
        let withhold = state.withhold_completion;

        let (path, received) = state
            .sessions
            .get_mut(&session.upload_url)
            .ok_or_else(|| anyhow::anyhow!("unknown session"))?;
        if range.start != received.len() as u64 || data.len() as u64 != range.len() {
            anyhow::bail!("unexpected range {range:?}");
        }
        received.extend_from_slice(&data);

        if received.len() as u64 == session.total_size && !withhold {
            let path = path.clone();
            let data = std::mem::take(received);
            state.sessions.remove(&session.upload_url);
            Ok(ChunkOutcome::Complete(Self::store_file(&mut state, &path, data)))
        } else {
            Ok(ChunkOutcome::Continue)
        }
    }

    async fn set_timestamps(
        &self,
        remote_id: &RemoteId,
        _created: DateTime<Utc>,
        _modified: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::SetTimestamps(remote_id.to_string()));
        if state.fail_timestamps {
            anyhow::bail!("patch rejected");
        }
        Ok(())
    }

    async fn delete_item(&self, remote_id: &RemoteId) -> anyhow::Result<DeleteOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(remote_id.to_string()));
        if state.fail_deletes.contains(remote_id) {
            anyhow::bail!("delete rejected for {remote_id}");
        }
        let before = state.files.len();
        state.files.retain(|_, (id, _)| *id != *remote_id);
        if state.files.len() < before {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyGone)
        }
    }
}

/// Metadata store backed by a map
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<RelativePath, FileRecord>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: FileRecord) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(record.relative_path.clone(), record);
        self
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }

    pub fn snapshot(&self) -> HashMap<RelativePath, FileRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IMetadataStore for MemoryStore {
    async fn load_all(&self) -> anyhow::Result<HashMap<RelativePath, FileRecord>> {
        Ok(self.snapshot())
    }

    async fn get(&self, path: &RelativePath) -> anyhow::Result<Option<FileRecord>> {
        Ok(self.records.lock().unwrap().get(path).cloned())
    }

    async fn upsert(&self, record: &FileRecord) -> anyhow::Result<()> {
        if *self.fail_writes.lock().unwrap() {
            anyhow::bail!("store is read-only");
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.relative_path.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, path: &RelativePath) -> anyhow::Result<bool> {
        if *self.fail_writes.lock().unwrap() {
            anyhow::bail!("store is read-only");
        }
        Ok(self.records.lock().unwrap().remove(path).is_some())
    }

    async fn totals(&self) -> anyhow::Result<(u64, u64)> {
        let records = self.records.lock().unwrap();
        let bytes = records.values().map(|r| r.size_bytes).sum();
        Ok((records.len() as u64, bytes))
    }
}

/// Writes `content` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
