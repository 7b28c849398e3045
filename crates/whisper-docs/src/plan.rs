// SPDX-License-Identifier: MIT
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{DocsError, Result};
use crate::rfc::{hash_markdown, RfcStatus, RfcStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTask {
    pub name: String,
    pub description: String,
    pub agent_type: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub tdd_phase: TddPhase,
    #[serde(default)]
    pub validation_criteria: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TddPhase {
    Red,
    Green,
    Refactor,
}

/// One entry recorded every time a plan is regenerated from its source RFC,
/// whether or not the RFC content actually changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncHistoryEntry {
    pub timestamp: String,
    pub previous_hash: String,
    pub new_hash: String,
    pub changes_detected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfcReference {
    pub rfc_id: String,
    pub rfc_hash: String,
    pub rfc_path: String,
    pub last_sync: String,
    #[serde(default)]
    pub sync_history: Vec<SyncHistoryEntry>,
}

/// Source RFC a plan was generated from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRfc {
    pub rfc_id: String,
    pub title: String,
}

/// Task names grouped by the TDD phase they belong to, derived from
/// `Plan::tasks` whenever a plan is saved or regenerated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TddPhases {
    #[serde(default)]
    pub red: Vec<String>,
    #[serde(default)]
    pub green: Vec<String>,
    #[serde(default)]
    pub refactor: Vec<String>,
}

fn group_tdd_phases(tasks: &[PlanTask]) -> TddPhases {
    let mut phases = TddPhases::default();
    for task in tasks {
        match task.tdd_phase {
            TddPhase::Red => phases.red.push(task.name.clone()),
            TddPhase::Green => phases.green.push(task.name.clone()),
            TddPhase::Refactor => phases.refactor.push(task.name.clone()),
        }
    }
    phases
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_type: String,
    pub title: String,
    pub description: String,
    pub agent_type: String,
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
    #[serde(default)]
    pub validation_criteria: Vec<String>,
    pub created: String,
    pub updated: String,
    #[serde(default)]
    pub refinement_history: Vec<String>,
    #[serde(default)]
    pub tdd_phases: TddPhases,
    #[serde(default)]
    pub source_rfc: SourceRfc,
}

/// Validates a plan's shape: the task list is non-empty and every task's
/// dependencies name other tasks that actually exist.
pub fn validate_plan(plan: &Plan) -> Result<()> {
    if plan.tasks.is_empty() {
        return Err(DocsError::InvalidPlan("plan has no tasks".into()));
    }
    let names: std::collections::HashSet<&str> = plan.tasks.iter().map(|t| t.name.as_str()).collect();
    for task in &plan.tasks {
        for dep in &task.dependencies {
            if !names.contains(dep.as_str()) {
                return Err(DocsError::InvalidPlan(format!(
                    "task '{}' depends on unknown task '{dep}'",
                    task.name
                )));
            }
        }
    }
    Ok(())
}

/// What `prepare_plan_from_rfc` hands back to the caller for LLM-driven
/// plan generation.
pub struct PreparedPlanContext {
    pub rfc_id: String,
    pub rfc_title: String,
    pub rfc_markdown: String,
    pub rfc_hash: String,
    pub plan_name: String,
}

pub struct PlanStore {
    root: PathBuf,
    rfc_store_root: PathBuf,
}

impl PlanStore {
    pub fn new(root: impl Into<PathBuf>, rfc_store_root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), rfc_store_root: rfc_store_root.into() }
    }

    fn rfc_store(&self) -> RfcStore {
        RfcStore::new(self.rfc_store_root.clone())
    }

    fn status_dir(&self, status: RfcStatus) -> PathBuf {
        self.root.join(status.folder())
    }

    fn plan_dir(&self, status: RfcStatus, plan_name: &str) -> PathBuf {
        self.status_dir(status).join(plan_name)
    }

    fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.status_dir(RfcStatus::InProgress))?;
        fs::create_dir_all(self.status_dir(RfcStatus::Archived))?;
        Ok(())
    }

    pub fn prepare_from_rfc(&self, rfc_id: &str) -> Result<PreparedPlanContext> {
        let rfc = self.rfc_store().read(rfc_id)?;
        let hash = hash_markdown(&rfc.markdown);
        let plan_name = format!("{}-plan-{}", rfc.sidecar.short_name, Utc::now().format("%Y-%m-%d"));
        Ok(PreparedPlanContext {
            rfc_id: rfc_id.to_string(),
            rfc_title: rfc.sidecar.title,
            rfc_markdown: rfc.markdown,
            rfc_hash: hash,
            plan_name,
        })
    }

    /// Writes `plan.json` plus `rfc_reference.json` and records the plan
    /// against the source RFC's sidecar.
    pub fn save_generated_plan(&self, rfc_id: &str, plan_name: &str, mut plan: Plan) -> Result<()> {
        self.ensure_dirs()?;
        let rfc = self.rfc_store().read(rfc_id)?;
        plan.tdd_phases = group_tdd_phases(&plan.tasks);
        plan.source_rfc = SourceRfc { rfc_id: rfc_id.to_string(), title: rfc.sidecar.title.clone() };
        validate_plan(&plan)?;
        let dir = self.plan_dir(RfcStatus::InProgress, plan_name);
        fs::create_dir_all(&dir)?;

        let reference = RfcReference {
            rfc_id: rfc_id.to_string(),
            rfc_hash: rfc.hash(),
            rfc_path: format!("{}/{}.md", rfc.status()?.folder(), rfc.sidecar.filename),
            last_sync: Utc::now().to_rfc3339(),
            sync_history: Vec::new(),
        };

        fs::write(dir.join("plan.json"), serde_json::to_string_pretty(&plan)?)?;
        fs::write(dir.join("rfc_reference.json"), serde_json::to_string_pretty(&reference)?)?;
        self.rfc_store().record_derived_plan(rfc_id, plan_name)?;
        Ok(())
    }

    fn locate(&self, plan_name: &str) -> Result<RfcStatus> {
        for status in [RfcStatus::InProgress, RfcStatus::Archived] {
            if self.plan_dir(status, plan_name).is_dir() {
                return Ok(status);
            }
        }
        Err(DocsError::PlanNotFound(plan_name.to_string()))
    }

    pub fn read(&self, plan_name: &str) -> Result<(Plan, RfcReference)> {
        let status = self.locate(plan_name)?;
        let dir = self.plan_dir(status, plan_name);
        let plan: Plan = serde_json::from_str(&fs::read_to_string(dir.join("plan.json"))?)?;
        let reference: RfcReference = serde_json::from_str(&fs::read_to_string(dir.join("rfc_reference.json"))?)?;
        Ok((plan, reference))
    }

    /// Drift check: a plan's reference hash must match the RFC's current
    /// content hash.
    pub fn check_drift(&self, plan_name: &str) -> Result<bool> {
        let (_, reference) = self.read(plan_name)?;
        let rfc = self.rfc_store().read(&reference.rfc_id)?;
        Ok(rfc.hash() != reference.rfc_hash)
    }

    /// Recomputes the RFC hash; no-ops unless it changed or `force` is set.
    /// When it does need updating, preserves each task's `status` for
    /// tasks whose name still exists, when `preserve_progress` is set.
    pub fn update_from_rfc(&self, plan_name: &str, regenerated: Plan, force: bool, preserve_progress: bool) -> Result<bool> {
        let status = self.locate(plan_name)?;
        let (existing, mut reference) = self.read(plan_name)?;
        let rfc = self.rfc_store().read(&reference.rfc_id)?;
        let current_hash = rfc.hash();

        if current_hash == reference.rfc_hash && !force {
            return Ok(false);
        }

        let mut plan = regenerated;
        if preserve_progress {
            for task in &mut plan.tasks {
                if let Some(prev) = existing.tasks.iter().find(|t| t.name == task.name) {
                    task.status = prev.status.clone();
                }
            }
        }
        plan.tdd_phases = group_tdd_phases(&plan.tasks);
        plan.source_rfc = SourceRfc { rfc_id: reference.rfc_id.clone(), title: rfc.sidecar.title.clone() };
        validate_plan(&plan)?;

        let previous_hash = reference.rfc_hash.clone();
        reference.sync_history.push(SyncHistoryEntry {
            timestamp: Utc::now().to_rfc3339(),
            previous_hash: previous_hash.clone(),
            new_hash: current_hash.clone(),
            changes_detected: previous_hash != current_hash,
        });
        reference.rfc_hash = current_hash;
        reference.last_sync = Utc::now().to_rfc3339();

        let dir = self.plan_dir(status, plan_name);
        fs::write(dir.join("plan.json"), serde_json::to_string_pretty(&plan)?)?;
        fs::write(dir.join("rfc_reference.json"), serde_json::to_string_pretty(&reference)?)?;
        Ok(true)
    }

    pub fn move_status(&self, plan_name: &str, target: RfcStatus) -> Result<()> {
        let status = self.locate(plan_name)?;
        if status == target {
            return Ok(());
        }
        fs::create_dir_all(self.status_dir(target))?;
        fs::rename(self.plan_dir(status, plan_name), self.plan_dir(target, plan_name))?;
        Ok(())
    }

    pub fn delete(&self, plan_name: &str) -> Result<()> {
        let status = self.locate(plan_name)?;
        let (_, reference) = self.read(plan_name)?;
        fs::remove_dir_all(self.plan_dir(status, plan_name))?;
        let _ = self.rfc_store().clear_derived_plan(&reference.rfc_id, plan_name);
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for status in [RfcStatus::InProgress, RfcStatus::Archived] {
            let dir = self.status_dir(status);
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.path().is_dir() {
                    out.push(entry.file_name().to_string_lossy().to_string());
                }
            }
        }
        out.sort();
        Ok(out)
    }
}
