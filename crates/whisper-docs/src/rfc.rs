// SPDX-License-Identifier: MIT
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DocsError, Result};

/// `in_progress`/`archived` folder an RFC or Plan currently lives in.
/// `new` is accepted at the parsing boundary as an alias for `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfcStatus {
    InProgress,
    Archived,
}

impl RfcStatus {
    pub fn folder(&self) -> &'static str {
        match self {
            RfcStatus::InProgress => "in_progress",
            RfcStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "in_progress" | "new" => Ok(RfcStatus::InProgress),
            "archived" => Ok(RfcStatus::Archived),
            other => Err(DocsError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub from: String,
    pub to: String,
    pub at: String,
}

/// Sidecar JSON accompanying each RFC markdown file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfcSidecar {
    pub rfc_id: String,
    pub filename: String,
    pub short_name: String,
    pub title: String,
    pub status: String,
    pub created: String,
    pub updated: String,
    pub author: String,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
    #[serde(default)]
    pub derived_plans: Vec<String>,
}

pub struct Rfc {
    pub sidecar: RfcSidecar,
    pub markdown: String,
}

impl Rfc {
    pub fn hash(&self) -> String {
        hash_markdown(&self.markdown)
    }

    pub fn status(&self) -> Result<RfcStatus> {
        RfcStatus::parse(&self.sidecar.status)
    }
}

pub fn hash_markdown(markdown: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markdown.as_bytes());
    hex::encode(hasher.finalize())
}

/// Slugifies a short name into `[a-z0-9-]+`, matching the pattern
/// `create_rfc`'s schema requires of its `short_name` argument.
pub fn slugify(short_name: &str) -> String {
    short_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn render_markdown(sidecar: &RfcSidecar, summary: &str, background: &str, requirements: &[String]) -> String {
    let requirements_block = if requirements.is_empty() {
        "- (none yet)".to_string()
    } else {
        requirements.iter().map(|r| format!("- {r}")).collect::<Vec<_>>().join("\n")
    };
    format!(
        "# RFC: {title}\n\n\
         **RFC ID**: {id}\n\
         **Status**: {status}\n\
         **Created**: {created}\n\
         **Last Updated**: {updated}\n\
         **Author**: {author}\n\n\
         ## Summary\n\n{summary}\n\n\
         ## Background\n\n{background}\n\n\
         ## Requirements\n\n{requirements_block}\n\n\
         ## Technical Considerations\n\n\
         ## Implementation Approach\n\n\
         ## Open Questions\n\n\
         ## Acceptance Criteria\n\n\
         ## Related RFCs\n\n\
         ## Refinement History\n\n",
        title = sidecar.title,
        id = sidecar.rfc_id,
        status = sidecar.status,
        created = sidecar.created,
        updated = sidecar.updated,
        author = sidecar.author,
    )
}

/// Directory store for RFC documents: two sibling `in_progress`/`archived`
/// folders, each document a markdown file plus a JSON sidecar.
pub struct RfcStore {
    root: PathBuf,
}

impl RfcStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn status_dir(&self, status: RfcStatus) -> PathBuf {
        self.root.join(status.folder())
    }

    fn sidecar_path(&self, status: RfcStatus, filename: &str) -> PathBuf {
        self.status_dir(status).join(format!("{filename}.json"))
    }

    fn markdown_path(&self, status: RfcStatus, filename: &str) -> PathBuf {
        self.status_dir(status).join(format!("{filename}.md"))
    }

    fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.status_dir(RfcStatus::InProgress))?;
        fs::create_dir_all(self.status_dir(RfcStatus::Archived))?;
        Ok(())
    }

    /// Picks the smallest unused `NNNN` for today's date across both
    /// status folders.
    fn next_id_for_today(&self, today: NaiveDate) -> Result<String> {
        let date_str = today.format("%Y-%m-%d").to_string();
        let prefix = format!("RFC-{date_str}-");
        let mut used = std::collections::HashSet::new();
        for status in [RfcStatus::InProgress, RfcStatus::Archived] {
            let dir = self.status_dir(status);
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(stripped) = name.strip_suffix(".json") {
                    if let Ok(sidecar) = self.read_sidecar_at(&entry.path()) {
                        if sidecar.rfc_id.starts_with(&prefix) {
                            used.insert(sidecar.rfc_id.clone());
                        }
                    }
                    let _ = stripped;
                }
            }
        }
        for n in 1..10000u32 {
            let candidate = format!("{prefix}{n:04}");
            if !used.contains(&candidate) {
                return Ok(candidate);
            }
        }
        Err(DocsError::InvalidStatus("exhausted RFC id space for today".into()))
    }

    fn read_sidecar_at(&self, path: &Path) -> Result<RfcSidecar> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn create(
        &self,
        title: &str,
        summary: &str,
        short_name: &str,
        background: Option<&str>,
        requirements: &[String],
        author: Option<&str>,
    ) -> Result<Rfc> {
        self.ensure_dirs()?;
        let today = Utc::now().date_naive();
        let rfc_id = self.next_id_for_today(today)?;
        let slug = slugify(short_name);
        let filename = format!("{slug}-{}", today.format("%Y-%m-%d"));
        let now = Utc::now().to_rfc3339();

        let sidecar = RfcSidecar {
            rfc_id,
            filename: filename.clone(),
            short_name: slug,
            title: title.to_string(),
            status: "in_progress".to_string(),
            created: now.clone(),
            updated: now,
            author: author.unwrap_or("User").to_string(),
            status_history: Vec::new(),
            derived_plans: Vec::new(),
        };
        let markdown = render_markdown(&sidecar, summary, background.unwrap_or(""), requirements);

        fs::write(self.markdown_path(RfcStatus::InProgress, &filename), &markdown)?;
        fs::write(self.sidecar_path(RfcStatus::InProgress, &filename), serde_json::to_string_pretty(&sidecar)?)?;

        Ok(Rfc { sidecar, markdown })
    }

    fn locate(&self, rfc_id: &str) -> Result<(RfcStatus, String)> {
        for status in [RfcStatus::InProgress, RfcStatus::Archived] {
            let dir = self.status_dir(status);
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(filename) = name.strip_suffix(".json") {
                    if let Ok(sidecar) = self.read_sidecar_at(&entry.path()) {
                        if sidecar.rfc_id == rfc_id {
                            return Ok((status, filename.to_string()));
                        }
                    }
                }
            }
        }
        Err(DocsError::RfcNotFound(rfc_id.to_string()))
    }

    pub fn read(&self, rfc_id: &str) -> Result<Rfc> {
        let (status, filename) = self.locate(rfc_id)?;
        let sidecar = self.read_sidecar_at(&self.sidecar_path(status, &filename))?;
        let markdown = fs::read_to_string(self.markdown_path(status, &filename))?;
        Ok(Rfc { sidecar, markdown })
    }

    pub fn update(&self, rfc_id: &str, new_markdown: Option<&str>, title: Option<&str>) -> Result<Rfc> {
        let (status, filename) = self.locate(rfc_id)?;
        let mut sidecar = self.read_sidecar_at(&self.sidecar_path(status, &filename))?;
        let mut markdown = fs::read_to_string(self.markdown_path(status, &filename))?;

        if let Some(t) = title {
            sidecar.title = t.to_string();
        }
        if let Some(m) = new_markdown {
            markdown = m.to_string();
        }
        sidecar.updated = Utc::now().to_rfc3339();

        fs::write(self.markdown_path(status, &filename), &markdown)?;
        fs::write(self.sidecar_path(status, &filename), serde_json::to_string_pretty(&sidecar)?)?;
        Ok(Rfc { sidecar, markdown })
    }

    /// Moves an RFC between status folders, rewriting its `Status` field,
    /// appending a history entry, moving both files atomically via rename.
    /// Reverse transitions are permitted.
    pub fn move_status(&self, rfc_id: &str, target: RfcStatus) -> Result<Rfc> {
        let (status, filename) = self.locate(rfc_id)?;
        if status == target {
            return self.read(rfc_id);
        }
        let mut sidecar = self.read_sidecar_at(&self.sidecar_path(status, &filename))?;
        let mut markdown = fs::read_to_string(self.markdown_path(status, &filename))?;

        let from = sidecar.status.clone();
        sidecar.status = target.folder().to_string();
        sidecar.status_history.push(StatusHistoryEntry {
            from,
            to: sidecar.status.clone(),
            at: Utc::now().to_rfc3339(),
        });
        sidecar.updated = Utc::now().to_rfc3339();
        markdown = markdown.replacen(
            &format!("**Status**: {}", status.folder()),
            &format!("**Status**: {}", target.folder()),
            1,
        );

        fs::create_dir_all(self.status_dir(target))?;
        fs::write(self.markdown_path(status, &filename), &markdown)?;
        fs::write(self.sidecar_path(status, &filename), serde_json::to_string_pretty(&sidecar)?)?;
        fs::rename(self.markdown_path(status, &filename), self.markdown_path(target, &filename))?;
        fs::rename(self.sidecar_path(status, &filename), self.sidecar_path(target, &filename))?;

        Ok(Rfc { sidecar, markdown })
    }

    pub fn delete(&self, rfc_id: &str) -> Result<()> {
        let (status, filename) = self.locate(rfc_id)?;
        fs::remove_file(self.markdown_path(status, &filename))?;
        fs::remove_file(self.sidecar_path(status, &filename))?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<RfcSidecar>> {
        let mut out = Vec::new();
        for status in [RfcStatus::InProgress, RfcStatus::Archived] {
            let dir = self.status_dir(status);
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if name.ends_with(".json") {
                    out.push(self.read_sidecar_at(&entry.path())?);
                }
            }
        }
        out.sort_by(|a, b| a.rfc_id.cmp(&b.rfc_id));
        Ok(out)
    }

    /// Records a newly derived plan name against the RFC's sidecar.
    pub fn record_derived_plan(&self, rfc_id: &str, plan_name: &str) -> Result<()> {
        let (status, filename) = self.locate(rfc_id)?;
        let mut sidecar = self.read_sidecar_at(&self.sidecar_path(status, &filename))?;
        if !sidecar.derived_plans.iter().any(|p| p == plan_name) {
            sidecar.derived_plans.push(plan_name.to_string());
        }
        fs::write(self.sidecar_path(status, &filename), serde_json::to_string_pretty(&sidecar)?)?;
        Ok(())
    }

    pub fn clear_derived_plan(&self, rfc_id: &str, plan_name: &str) -> Result<()> {
        let (status, filename) = self.locate(rfc_id)?;
        let mut sidecar = self.read_sidecar_at(&self.sidecar_path(status, &filename))?;
        sidecar.derived_plans.retain(|p| p != plan_name);
        fs::write(self.sidecar_path(status, &filename), serde_json::to_string_pretty(&sidecar)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, RfcStore) {
        let dir = tempdir().unwrap();
        let store = RfcStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn create_generates_id_and_both_files() {
        let (_dir, store) = store();
        let rfc = store.create("Dark Mode", "Add dark mode", "dark-mode", None, &[], None).unwrap();
        assert!(rfc.sidecar.rfc_id.starts_with("RFC-"));
        assert!(rfc.sidecar.rfc_id.ends_with("-0001"));
        assert_eq!(rfc.sidecar.status, "in_progress");
    }

    #[test]
    fn second_create_same_day_picks_next_id() {
        let (_dir, store) = store();
        let a = store.create("A", "a", "a-feature", None, &[], None).unwrap();
        let b = store.create("B", "b", "b-feature", None, &[], None).unwrap();
        assert_ne!(a.sidecar.rfc_id, b.sidecar.rfc_id);
        assert!(b.sidecar.rfc_id.ends_with("-0002"));
    }

    #[test]
    fn move_to_archived_then_back() {
        let (_dir, store) = store();
        let rfc = store.create("A", "a", "a-feature", None, &[], None).unwrap();
        let archived = store.move_status(&rfc.sidecar.rfc_id, RfcStatus::Archived).unwrap();
        assert_eq!(archived.sidecar.status, "archived");
        let back = store.move_status(&rfc.sidecar.rfc_id, RfcStatus::InProgress).unwrap();
        assert_eq!(back.sidecar.status, "in_progress");
        assert_eq!(back.sidecar.status_history.len(), 2);
    }

    #[test]
    fn hash_changes_when_markdown_changes() {
        let (_dir, store) = store();
        let rfc = store.create("A", "a", "a-feature", None, &[], None).unwrap();
        let h1 = rfc.hash();
        let updated = store.update(&rfc.sidecar.rfc_id, Some("# changed"), None).unwrap();
        assert_ne!(h1, updated.hash());
    }

    #[test]
    fn delete_removes_both_files() {
        let (_dir, store) = store();
        let rfc = store.create("A", "a", "a-feature", None, &[], None).unwrap();
        store.delete(&rfc.sidecar.rfc_id).unwrap();
        assert!(store.read(&rfc.sidecar.rfc_id).is_err());
    }

    #[test]
    fn status_alias_new_parses_as_in_progress() {
        assert_eq!(RfcStatus::parse("new").unwrap(), RfcStatus::InProgress);
        assert!(RfcStatus::parse("bogus").is_err());
    }

    #[test]
    fn list_returns_all_created_rfcs_sorted() {
        let (_dir, store) = store();
        store.create("A", "a", "a-feature", None, &[], None).unwrap();
        store.create("B", "b", "b-feature", None, &[], None).unwrap();
        let list = store.list().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].rfc_id <= list[1].rfc_id);
    }
}
