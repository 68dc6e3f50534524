//! Local-filesystem `DirectoryManager` (§6): one directory per plan under a
//! configured root, with a symlink scoping the externally-uploaded files
//! named by `upload_key` into that directory for the lifetime of the plan.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use agentcore_core::error::AgentCoreError;
use agentcore_core::traits::DirectoryManager;

pub struct LocalDirectoryManager {
    plans_root: PathBuf,
    uploads_root: PathBuf,
}

impl LocalDirectoryManager {
    pub fn new(plans_root: impl Into<PathBuf>, uploads_root: impl Into<PathBuf>) -> Self {
        Self { plans_root: plans_root.into(), uploads_root: uploads_root.into() }
    }

    fn link_path(&self, plan_id: &str) -> PathBuf {
        self.root_plan_dir(plan_id).join("uploads")
    }
}

#[async_trait]
impl DirectoryManager for LocalDirectoryManager {
    fn root_plan_dir(&self, plan_id: &str) -> PathBuf {
        self.plans_root.join(plan_id)
    }

    async fn ensure_external_folder_link(&self, plan_id: &str, upload_key: &str) -> Result<(), AgentCoreError> {
        let plan_dir = self.root_plan_dir(plan_id);
        std::fs::create_dir_all(&plan_dir)
            .map_err(|e| AgentCoreError::PlanFatal(format!("failed to create plan dir {}: {e}", plan_dir.display())))?;

        let target = self.uploads_root.join(upload_key);
        let link = self.link_path(plan_id);
        if link.exists() || link.is_symlink() {
            return Ok(());
        }
        symlink_dir(&target, &link)
            .map_err(|e| AgentCoreError::PlanFatal(format!("failed to link {} -> {}: {e}", link.display(), target.display())))
    }

    async fn remove_external_folder_link(&self, plan_id: &str) -> Result<(), AgentCoreError> {
        let link = self.link_path(plan_id);
        if link.is_symlink() || link.exists() {
            std::fs::remove_file(&link)
                .or_else(|_| std::fs::remove_dir(&link))
                .map_err(|e| AgentCoreError::PlanFatal(format!("failed to remove link {}: {e}", link.display())))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn links_then_unlinks_the_upload_folder() {
        let tmp = std::env::temp_dir().join(format!("agentcore-dirmgr-test-{}", std::process::id()));
        let plans_root = tmp.join("plans");
        let uploads_root = tmp.join("uploads");
        std::fs::create_dir_all(uploads_root.join("key1")).unwrap();

        let mgr = LocalDirectoryManager::new(&plans_root, &uploads_root);
        mgr.ensure_external_folder_link("plan1", "key1").await.unwrap();
        assert!(mgr.link_path("plan1").exists());

        mgr.remove_external_folder_link("plan1").await.unwrap();
        assert!(!mgr.link_path("plan1").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
