//! Authorized-user list mirrored to a JSON file.
//!
//! The file holds a flat JSON array of Telegram user ids. The super admin is
//! configured separately and is never written to the file.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use crate::{domain::UserId, Result};

#[derive(Debug)]
pub struct AccessList {
    path: PathBuf,
    super_admin: UserId,
    members: BTreeSet<i64>,
}

impl AccessList {
    /// Empty list backed by `path`. Call [`AccessList::load`] to read the file.
    pub fn new(path: impl Into<PathBuf>, super_admin: UserId) -> Self {
        Self {
            path: path.into(),
            super_admin,
            members: BTreeSet::new(),
        }
    }

    /// Replace the in-memory set with the file contents.
    ///
    /// A missing, unreadable or malformed file leaves the list empty; startup
    /// never fails because of it.
    pub async fn load(&mut self) {
        match read_members(&self.path).await {
            Ok(members) => {
                tracing::info!(
                    path = %self.path.display(),
                    count = members.len(),
                    "loaded authorized users"
                );
                self.members = members;
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "authorized users file missing or invalid, starting with an empty list"
                );
                self.members.clear();
            }
        }
    }

    /// Persist the current set. Failures are logged and otherwise ignored.
    pub async fn save(&self) {
        if let Err(e) = write_members(&self.path, &self.members).await {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "failed to save authorized users"
            );
        }
    }

    pub fn is_authorized(&self, user_id: Option<UserId>) -> bool {
        let Some(user_id) = user_id else {
            return false;
        };
        user_id == self.super_admin || self.members.contains(&user_id.0)
    }

    pub fn is_super_admin(&self, user_id: Option<UserId>) -> bool {
        user_id == Some(self.super_admin)
    }

    pub fn super_admin(&self) -> UserId {
        self.super_admin
    }

    /// Returns `false` (and changes nothing) if the id is already present.
    pub fn add(&mut self, user_id: UserId) -> bool {
        self.members.insert(user_id.0)
    }

    /// Returns `false` (and changes nothing) if the id is absent.
    pub fn remove(&mut self, user_id: UserId) -> bool {
        self.members.remove(&user_id.0)
    }

    /// Members in ascending order. The super admin is not included.
    pub fn list(&self) -> Vec<i64> {
        self.members.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

async fn read_members(path: &Path) -> Result<BTreeSet<i64>> {
    let txt = tokio::fs::read_to_string(path).await?;
    let ids: Vec<i64> = serde_json::from_str(&txt)?;
    Ok(ids.into_iter().collect())
}

async fn write_members(path: &Path, members: &BTreeSet<i64>) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }

    let ids: Vec<i64> = members.iter().copied().collect();
    let txt = serde_json::to_string_pretty(&ids)?;

    // Write next to the target and rename so readers never see a partial file.
    let tmp = tmp_path_for(path);
    if let Err(e) = tokio::fs::write(&tmp, txt).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "authorized_users.json".to_string());
    path.with_file_name(format!(".{name}.tmp.{}", std::process::id()))
}
