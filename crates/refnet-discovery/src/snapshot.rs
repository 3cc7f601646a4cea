//! Per-user persistence of the last presented search.
//!
//! Two JSON documents live under `<root>/<user_id>/`: the session record
//! (with its phase) and the ranked office list. Both are written on every
//! phase change and removed on clear.
//!
//! Each file is replaced through a temporary file and a rename. The office
//! list is written first and the session document last; both carry the same
//! revision, so a load that finds them out of step ignores the pair.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use refnet_core::DiscoverySession;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::ranker::RankedOffice;
use crate::state::SearchPhase;

pub const SESSION_FILE: &str = "discovery_session.json";
pub const OFFICES_FILE: &str = "discovery_offices.json";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SearchPhase,
    pub session: Option<DiscoverySession>,
    pub offices: Vec<RankedOffice>,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved for `user_id`.
    async fn load(&self, user_id: Uuid) -> Result<Option<SessionSnapshot>, StoreError>;
    async fn save(&self, user_id: Uuid, snapshot: &SessionSnapshot) -> Result<(), StoreError>;
    async fn clear(&self, user_id: Uuid) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionDocument {
    revision: Uuid,
    phase: SearchPhase,
    session: Option<DiscoverySession>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OfficesDocument {
    revision: Uuid,
    offices: Vec<RankedOffice>,
}

/// [`SnapshotStore`] backed by JSON files on local disk.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    root: PathBuf,
}

impl JsonFileSnapshotStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn user_dir(&self, user_id: Uuid) -> PathBuf {
        self.root.join(user_id.to_string())
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes `bytes` next to `path` and renames it into place.
async fn write_replace(path: &Path, bytes: Vec<u8>) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_optional(path: &Path) -> Result<(), StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<SessionSnapshot>, StoreError> {
        let dir = self.user_dir(user_id);
        let Some(session_bytes) = read_optional(&dir.join(SESSION_FILE)).await? else {
            return Ok(None);
        };
        let doc: SessionDocument = serde_json::from_slice(&session_bytes)?;
        let Some(offices_bytes) = read_optional(&dir.join(OFFICES_FILE)).await? else {
            tracing::warn!(%user_id, "discovery snapshot has no office list; ignoring it");
            return Ok(None);
        };
        let offices: OfficesDocument = serde_json::from_slice(&offices_bytes)?;
        if offices.revision != doc.revision {
            tracing::warn!(
                %user_id,
                session_revision = %doc.revision,
                offices_revision = %offices.revision,
                "discovery snapshot files are out of step; ignoring them"
            );
            return Ok(None);
        }
        Ok(Some(SessionSnapshot {
            phase: doc.phase,
            session: doc.session,
            offices: offices.offices,
        }))
    }

    async fn save(&self, user_id: Uuid, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let dir = self.user_dir(user_id);
        tokio::fs::create_dir_all(&dir).await?;
        let revision = Uuid::new_v4();
        let offices = OfficesDocument {
            revision,
            offices: snapshot.offices.clone(),
        };
        let doc = SessionDocument {
            revision,
            phase: snapshot.phase,
            session: snapshot.session.clone(),
        };
        write_replace(&dir.join(OFFICES_FILE), serde_json::to_vec_pretty(&offices)?).await?;
        write_replace(&dir.join(SESSION_FILE), serde_json::to_vec_pretty(&doc)?).await?;
        Ok(())
    }

    async fn clear(&self, user_id: Uuid) -> Result<(), StoreError> {
        let dir = self.user_dir(user_id);
        remove_optional(&dir.join(SESSION_FILE)).await?;
        remove_optional(&dir.join(OFFICES_FILE)).await?;
        Ok(())
    }
}
