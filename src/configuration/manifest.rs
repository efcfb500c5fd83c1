use config::{Config, ConfigError, File, FileFormat};
use serde_derive::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// One action of a spec or hook body, run in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Sleep(#[serde(with = "crate::configuration::deserialize::duration")] Duration),
    Log(String),
    Fail(String),
    /// Requests a skip and ends the body.
    Skip(String),
    Equal(Vec<Value>),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookEntry {
    #[serde(default)]
    pub skip: bool,
    #[serde(default, with = "crate::configuration::deserialize::optional_duration")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecEntry {
    pub name: String,
    #[serde(default)]
    pub only: bool,
    #[serde(default)]
    pub skip: bool,
    #[serde(default, with = "crate::configuration::deserialize::optional_duration")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildEntry {
    Suite(SuiteEntry),
    Spec(SpecEntry),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuiteEntry {
    pub name: String,
    #[serde(default)]
    pub only: bool,
    #[serde(default)]
    pub skip: bool,
    #[serde(default, with = "crate::configuration::deserialize::optional_duration")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub before_all: Vec<HookEntry>,
    #[serde(default)]
    pub after_all: Vec<HookEntry>,
    #[serde(default)]
    pub before_each: Vec<HookEntry>,
    #[serde(default)]
    pub after_each: Vec<HookEntry>,
    #[serde(default)]
    pub children: Vec<ChildEntry>,
}

/// A run description: the root suite and everything declared beneath it.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub root: SuiteEntry,
}

impl Manifest {
    pub fn from(file: PathBuf) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(file))
            .build()?
            .try_deserialize()
    }

    pub fn from_content(content: &str, format: FileFormat) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(content, format))
            .build()?
            .try_deserialize()
    }
}
