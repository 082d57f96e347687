use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Worker count applied when a manifest leaves `concurrency` unset
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Failure policy applied when a manifest leaves `continue_on_error` unset
pub const DEFAULT_CONTINUE_ON_ERROR: bool = true;

/// Type-specific job options, forwarded verbatim to the executor
pub type JobOptions = HashMap<String, serde_json::Value>;

/// Kind of video generation a job requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Text-to-video generation
    Generate,
    /// Image-to-video animation
    Animate,
    /// Video between a first and a last frame
    Interpolate,
    /// Continuation of an existing video
    Extend,
}

impl JobType {
    /// All supported job types
    pub const ALL: [JobType; 4] = [
        JobType::Generate,
        JobType::Animate,
        JobType::Interpolate,
        JobType::Extend,
    ];

    /// Option keys that must be present for this job type
    pub fn required_options(self) -> &'static [&'static str] {
        match self {
            JobType::Generate => &["prompt"],
            JobType::Animate => &["image", "prompt"],
            JobType::Interpolate => &["first_frame", "last_frame"],
            JobType::Extend => &["video"],
        }
    }

    /// Tag used in manifest documents
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Generate => "generate",
            JobType::Animate => "animate",
            JobType::Interpolate => "interpolate",
            JobType::Extend => "extend",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type tag of a job as it appeared in the manifest.
///
/// Unrecognised tags are kept so validation can report them in job order
/// instead of failing the whole parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobKind {
    /// One of the supported job types
    Known(JobType),
    /// Tag that matches no supported job type
    Unknown(String),
}

impl From<JobType> for JobKind {
    fn from(job_type: JobType) -> Self {
        JobKind::Known(job_type)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Known(job_type) => job_type.fmt(f),
            JobKind::Unknown(tag) => f.write_str(tag),
        }
    }
}

/// A single unit of work in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier, unique within the manifest; an absent key reads as empty
    #[serde(default)]
    pub id: String,
    /// Requested job type
    #[serde(rename = "type")]
    pub kind: JobKind,
    /// Type-specific options
    #[serde(default)]
    pub options: JobOptions,
    /// Destination path of the produced video; an absent key reads as empty
    #[serde(default)]
    pub output: String,
}

impl Job {
    /// Create a job with no options
    pub fn new(id: impl Into<String>, job_type: JobType, output: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: JobKind::Known(job_type),
            options: JobOptions::new(),
            output: output.into(),
        }
    }

    /// Add an option, builder style
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// The job type, if the manifest tag was recognised
    pub fn job_type(&self) -> Option<JobType> {
        match self.kind {
            JobKind::Known(job_type) => Some(job_type),
            JobKind::Unknown(_) => None,
        }
    }

    /// String option lookup
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }
}

/// Full description of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Jobs in submission order
    #[serde(default)]
    pub jobs: Vec<Job>,
    /// Worker count; `None` until defaults are applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Failure policy; `None` until defaults are applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,
    /// Base directory for relative job outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,
}

impl Manifest {
    /// Create a manifest with unset settings
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs,
            ..Default::default()
        }
    }

    /// Set the worker count
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Set the failure policy
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = Some(continue_on_error);
        self
    }

    /// Set the output directory
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    /// Failure policy with the default resolved
    pub fn continue_on_error(&self) -> bool {
        self.continue_on_error.unwrap_or(DEFAULT_CONTINUE_ON_ERROR)
    }

    /// Destination of a job's output, resolved against `output_directory`.
    ///
    /// Absolute job outputs are returned unchanged.
    pub fn output_path_for(&self, job: &Job) -> PathBuf {
        let output = Path::new(&job.output);
        match &self.output_directory {
            Some(dir) if output.is_relative() => dir.join(output),
            _ => output.to_path_buf(),
        }
    }
}
