use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::bindings::{Artifact, ContractKind};

/// Resolves contract names to ABIs: the embedded contracts first, then
/// compiled artifacts found under an optional artifacts directory.
#[derive(Debug, Default)]
pub struct AbiResolver {
    artifacts_dir: Option<PathBuf>,
    memory_cache: HashMap<String, Artifact>,
}

impl AbiResolver {
    pub fn new(artifacts_dir: Option<PathBuf>) -> Self {
        Self {
            artifacts_dir,
            memory_cache: HashMap::new(),
        }
    }

    pub fn artifacts_dir(&self) -> Option<&Path> {
        self.artifacts_dir.as_deref()
    }

    pub fn resolve(&self, kind: ContractKind) -> Artifact {
        Artifact::embedded(kind)
    }

    /// Embedded contract by name or alias, else a cached or on-disk artifact.
    pub async fn resolve_name(&mut self, name: &str) -> Result<Artifact> {
        if let Ok(kind) = ContractKind::from_str(name) {
            return Ok(self.resolve(kind));
        }
        self.resolve_artifact(name).await
    }

    /// Compiled artifact for `name`, skipping the embedded ABIs. Used for
    /// deployments, which need bytecode.
    pub async fn resolve_artifact(&mut self, name: &str) -> Result<Artifact> {
        let key = name.to_lowercase();
        if let Some(artifact) = self.memory_cache.get(&key) {
            debug!("Artifact cache hit for {}", name);
            return Ok(artifact.clone());
        }

        let path = self.find_artifact_file(name).ok_or_else(|| match &self.artifacts_dir {
            Some(dir) => anyhow!("No ABI for '{}': no artifact found under {:?}", name, dir),
            None => anyhow!(
                "Unknown contract '{}' and no artifacts_dir is configured. Known contracts: {}",
                name,
                ContractKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })?;

        info!("Loading artifact {} from {:?}", name, path);
        let mut artifact = Artifact::from_file(&path).await?;
        artifact.name = name.to_string();
        self.memory_cache.insert(key, artifact.clone());
        Ok(artifact)
    }

    /// `<dir>/<Name>.json`, then the Foundry layout `<dir>/<Name>.sol/<Name>.json`.
    fn artifact_candidates(&self, name: &str) -> Vec<PathBuf> {
        match &self.artifacts_dir {
            Some(dir) => vec![
                dir.join(format!("{}.json", name)),
                dir.join(format!("{}.sol", name)).join(format!("{}.json", name)),
            ],
            None => Vec::new(),
        }
    }

    fn find_artifact_file(&self, name: &str) -> Option<PathBuf> {
        self.artifact_candidates(name)
            .into_iter()
            .find(|path| path.is_file())
    }

    /// Registers an artifact under its own name, replacing any cached one.
    pub fn add_artifact(&mut self, artifact: Artifact) {
        info!("Added artifact for {}", artifact.name);
        self.memory_cache
            .insert(artifact.name.to_lowercase(), artifact);
    }

    /// Whether `name` resolves without error, without loading anything.
    pub fn has_abi(&self, name: &str) -> bool {
        ContractKind::from_str(name).is_ok()
            || self.memory_cache.contains_key(&name.to_lowercase())
            || self.find_artifact_file(name).is_some()
    }

    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.memory_cache.values().map(|a| a.name.clone()).collect();
        names.sort();
        names
    }

    /// Drops loaded artifacts; they are read from disk again on next use.
    pub fn clear_cache(&mut self) {
        self.memory_cache.clear();
        info!("Cleared artifact cache");
    }
}
