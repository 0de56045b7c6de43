//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::app::classify::{Classifier, FilterRules, LanguageMap};
use crate::app::export::{BundleFormat, Preambles, PromptTemplate};
use crate::app::tokens::TokenModel;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".ctxbundle/config.toml";

/// Layered configuration loaded from defaults, user, workspace, explicit file, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub scan: Scan,
    #[serde(default)]
    pub filter: FilterRules,
    #[serde(default)]
    pub languages: LanguageMap,
    #[serde(default)]
    pub templates: Templates,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    format: Option<BundleFormat>,
    #[serde(default)]
    template: Option<PromptTemplate>,
    #[serde(default)]
    tokenizer: Option<TokenModel>,
}

impl Defaults {
    pub fn format(&self) -> BundleFormat {
        self.format.unwrap_or_default()
    }

    pub fn template(&self) -> PromptTemplate {
        self.template.unwrap_or_default()
    }

    pub fn tokenizer(&self) -> TokenModel {
        self.tokenizer.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    #[serde(default)]
    respect_gitignore: Option<bool>,
    #[serde(default)]
    include_hidden: Option<bool>,
    #[serde(default)]
    max_file_size: Option<u64>,
    /// Extra paths or globs pruned from directory scans.
    #[serde(default)]
    pub globs: Vec<String>,
}

impl Scan {
    fn default_max_file_size() -> u64 {
        1024 * 1024
    }

    pub fn respect_gitignore(&self) -> bool {
        self.respect_gitignore.unwrap_or(true)
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden.unwrap_or(true)
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
            .unwrap_or_else(Self::default_max_file_size)
    }
}

/// Preamble overrides keyed by template name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Templates {
    #[serde(default)]
    pub claude: Option<String>,
    #[serde(default)]
    pub chatgpt: Option<String>,
    #[serde(default)]
    pub gemini: Option<String>,
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    format: Option<String>,
    template: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            format: env::var("CTXBUNDLE_FORMAT").ok(),
            template: env::var("CTXBUNDLE_TEMPLATE").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(format: &str, template: &str) -> Self {
        Self {
            format: Some(format.to_owned()),
            template: Some(template.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, an optional
    /// explicit file, and env overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        let explicit = explicit.map(Path::to_path_buf);
        if let Some(path) = &explicit
            && !path.exists()
        {
            anyhow::bail!("config file not found: {}", path.display());
        }
        Self::load_with_layers(global, workspace, explicit, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        explicit: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = vec![Self::default(), Self::from_str(&DEFAULT_CONFIG)?];

        for path in [global, workspace, explicit].into_iter().flatten() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config layer");
                layers.push(Self::from_file(&path)?);
            }
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        apply_env_overrides(merged, env_overrides)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            scan: merge_scan(self.scan, other.scan),
            filter: merge_filter(self.filter, other.filter),
            languages: merge_languages(self.languages, other.languages),
            templates: merge_templates(self.templates, other.templates),
        }
    }

    /// Build a classifier from the configured ignore lists and language map.
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.filter.clone(), self.languages.clone())
    }

    /// Built-in preambles with configured overrides applied.
    pub fn preambles(&self) -> Preambles {
        let mut preambles = Preambles::default();
        if let Some(claude) = &self.templates.claude {
            preambles.claude = claude.clone();
        }
        if let Some(chatgpt) = &self.templates.chatgpt {
            preambles.chatgpt = chatgpt.clone();
        }
        if let Some(gemini) = &self.templates.gemini {
            preambles.gemini = gemini.clone();
        }
        preambles
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        format: overlay.format.or(base.format),
        template: overlay.template.or(base.template),
        tokenizer: overlay.tokenizer.or(base.tokenizer),
    }
}

fn merge_scan(base: Scan, overlay: Scan) -> Scan {
    Scan {
        respect_gitignore: overlay.respect_gitignore.or(base.respect_gitignore),
        include_hidden: overlay.include_hidden.or(base.include_hidden),
        max_file_size: overlay.max_file_size.or(base.max_file_size),
        globs: union(base.globs, overlay.globs),
    }
}

fn merge_filter(base: FilterRules, overlay: FilterRules) -> FilterRules {
    FilterRules {
        ignored_dirs: union(base.ignored_dirs, overlay.ignored_dirs),
        ignored_files: union(base.ignored_files, overlay.ignored_files),
        binary_extensions: union(base.binary_extensions, overlay.binary_extensions),
    }
}

fn merge_languages(mut base: LanguageMap, overlay: LanguageMap) -> LanguageMap {
    base.extend(overlay);
    base
}

fn merge_templates(base: Templates, overlay: Templates) -> Templates {
    Templates {
        claude: overlay.claude.or(base.claude),
        chatgpt: overlay.chatgpt.or(base.chatgpt),
        gemini: overlay.gemini.or(base.gemini),
    }
}

fn union(base: Vec<String>, overlay: Vec<String>) -> Vec<String> {
    let merged: BTreeSet<String> = base.into_iter().chain(overlay).collect();
    merged.into_iter().collect()
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("ctxbundle/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(format) = env.format {
        let format = format
            .parse()
            .with_context(|| "invalid CTXBUNDLE_FORMAT".to_string())?;
        config.defaults.format = Some(format);
    }
    if let Some(template) = env.template {
        let template = template
            .parse()
            .with_context(|| "invalid CTXBUNDLE_TEMPLATE".to_string())?;
        config.defaults.template = Some(template);
    }
    Ok(config)
}
