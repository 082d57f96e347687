//! Manifest default application and validation
//!
//! Validation is fail-fast: checks run in a fixed order and the first failure
//! is returned. Option values are not inspected here, only key presence.

use std::collections::HashSet;

use thiserror::Error;

use super::types::{JobKind, Manifest, DEFAULT_CONCURRENCY, DEFAULT_CONTINUE_ON_ERROR};

/// Manifest validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The manifest has no jobs
    #[error("manifest contains no jobs")]
    EmptyManifest,

    /// Concurrency below one
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// A job without an ID
    #[error("job at index {index} is missing an id")]
    MissingId {
        /// Position of the job in the manifest
        index: usize,
    },

    /// An ID used by an earlier job
    #[error("job at index {index} reuses id '{id}'")]
    DuplicateId {
        /// Position of the job in the manifest
        index: usize,
        /// The repeated ID
        id: String,
    },

    /// A job without an output path
    #[error("job '{id}' is missing an output path")]
    MissingOutput {
        /// Job ID
        id: String,
    },

    /// A job whose type tag is not supported
    #[error("job '{id}' has invalid type '{job_type}'")]
    InvalidType {
        /// Job ID
        id: String,
        /// The unsupported tag
        job_type: String,
    },

    /// A required option key is absent
    #[error("job '{id}' ({job_type}) is missing required option '{option}'")]
    MissingOption {
        /// Job ID
        id: String,
        /// Job type tag
        job_type: String,
        /// Missing option key
        option: String,
    },
}

/// Fill unset batch settings with their defaults.
///
/// Only unset fields are touched: an explicit `continue_on_error: false`
/// survives and an explicit `concurrency: 0` is left for [`validate`] to reject.
/// Applying defaults twice is a no-op.
pub fn apply_defaults(manifest: &mut Manifest) {
    manifest.concurrency.get_or_insert(DEFAULT_CONCURRENCY);
    manifest.continue_on_error.get_or_insert(DEFAULT_CONTINUE_ON_ERROR);
}

/// Check the structural and semantic invariants of a manifest
pub fn validate(manifest: &Manifest) -> Result<(), ValidationError> {
    if manifest.jobs.is_empty() {
        return Err(ValidationError::EmptyManifest);
    }

    let concurrency = manifest.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency < 1 {
        return Err(ValidationError::InvalidConcurrency(concurrency));
    }

    let mut seen = HashSet::with_capacity(manifest.jobs.len());
    for (index, job) in manifest.jobs.iter().enumerate() {
        if job.id.is_empty() {
            return Err(ValidationError::MissingId { index });
        }
        if !seen.insert(job.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                index,
                id: job.id.clone(),
            });
        }
        if job.output.is_empty() {
            return Err(ValidationError::MissingOutput { id: job.id.clone() });
        }

        let job_type = match &job.kind {
            JobKind::Known(job_type) => *job_type,
            JobKind::Unknown(tag) => {
                return Err(ValidationError::InvalidType {
                    id: job.id.clone(),
                    job_type: tag.clone(),
                });
            }
        };

        if let Some(missing) = job_type
            .required_options()
            .iter()
            .find(|key| !job.options.contains_key(**key))
        {
            return Err(ValidationError::MissingOption {
                id: job.id.clone(),
                job_type: job_type.to_string(),
                option: (*missing).to_string(),
            });
        }
    }

    Ok(())
}

impl Manifest {
    /// Apply defaults, then validate
    pub fn prepare(&mut self) -> Result<(), ValidationError> {
        apply_defaults(self);
        validate(self)
    }

    /// Validate without modifying the manifest
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Job, JobType};

    fn generate(id: &str) -> Job {
        Job::new(id, JobType::Generate, format!("{}.mp4", id)).with_option("prompt", "a cat")
    }

    #[test]
    fn test_empty_manifest_rejected() {
        let manifest = Manifest::new(vec![]);
        assert_eq!(validate(&manifest), Err(ValidationError::EmptyManifest));
    }

    #[test]
    fn test_empty_manifest_checked_before_concurrency() {
        let manifest = Manifest::new(vec![]).with_concurrency(0);
        assert_eq!(validate(&manifest), Err(ValidationError::EmptyManifest));
    }

    #[test]
    fn test_zero_concurrency_is_not_defaulted() {
        let mut manifest = Manifest::new(vec![generate("a")]).with_concurrency(0);
        assert_eq!(manifest.prepare(), Err(ValidationError::InvalidConcurrency(0)));
        assert_eq!(manifest.concurrency, Some(0));
    }

    #[test]
    fn test_apply_defaults_only_fills_unset_fields() {
        let mut manifest = Manifest::new(vec![generate("a")]);
        apply_defaults(&mut manifest);
        assert_eq!(manifest.concurrency, Some(DEFAULT_CONCURRENCY));
        assert_eq!(manifest.continue_on_error, Some(true));

        let mut explicit = Manifest::new(vec![generate("a")])
            .with_concurrency(7)
            .with_continue_on_error(false);
        apply_defaults(&mut explicit);
        assert_eq!(explicit.concurrency, Some(7));
        assert_eq!(explicit.continue_on_error, Some(false));
    }

    #[test]
    fn test_apply_defaults_is_idempotent() {
        let mut once = Manifest::new(vec![generate("a")]);
        apply_defaults(&mut once);
        let mut twice = once.clone();
        apply_defaults(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_id_reports_index() {
        let manifest = Manifest::new(vec![generate("a"), generate("")]);
        assert_eq!(validate(&manifest), Err(ValidationError::MissingId { index: 1 }));
    }

    #[test]
    fn test_duplicate_id() {
        let manifest = Manifest::new(vec![generate("a"), generate("b"), generate("a")]);
        assert_eq!(
            validate(&manifest),
            Err(ValidationError::DuplicateId { index: 2, id: "a".to_string() })
        );
    }

    #[test]
    fn test_ids_compare_exactly() {
        let manifest = Manifest::new(vec![generate("a"), generate("A"), generate("a ")]);
        assert!(validate(&manifest).is_ok());
    }

    #[test]
    fn test_missing_output() {
        let mut job = generate("a");
        job.output.clear();
        let manifest = Manifest::new(vec![job]);
        assert_eq!(
            validate(&manifest),
            Err(ValidationError::MissingOutput { id: "a".to_string() })
        );
    }

    #[test]
    fn test_invalid_type_checked_after_output() {
        let mut job = generate("a");
        job.kind = JobKind::Unknown("upscale".to_string());
        let manifest = Manifest::new(vec![job.clone()]);
        assert_eq!(
            validate(&manifest),
            Err(ValidationError::InvalidType {
                id: "a".to_string(),
                job_type: "upscale".to_string()
            })
        );

        job.output.clear();
        let manifest = Manifest::new(vec![job]);
        assert!(matches!(validate(&manifest), Err(ValidationError::MissingOutput { .. })));
    }

    #[test]
    fn test_missing_required_options() {
        let animate =
            Job::new("anim", JobType::Animate, "anim.mp4").with_option("image", "cat.png");
        let manifest = Manifest::new(vec![animate]);
        assert_eq!(
            validate(&manifest),
            Err(ValidationError::MissingOption {
                id: "anim".to_string(),
                job_type: "animate".to_string(),
                option: "prompt".to_string(),
            })
        );

        let interpolate = Job::new("interp", JobType::Interpolate, "i.mp4")
            .with_option("last_frame", "end.png");
        let err = validate(&Manifest::new(vec![interpolate])).unwrap_err();
        assert!(err.to_string().contains("first_frame"));

        let extend = Job::new("ext", JobType::Extend, "e.mp4");
        let err = validate(&Manifest::new(vec![extend])).unwrap_err();
        assert!(err.to_string().contains("video"));
    }

    #[test]
    fn test_option_presence_ignores_value() {
        let job = Job::new("a", JobType::Generate, "a.mp4")
            .with_option("prompt", serde_json::Value::Null);
        assert!(validate(&Manifest::new(vec![job])).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        let bad_options = Job::new("x", JobType::Extend, "x.mp4");
        let manifest = Manifest::new(vec![bad_options, generate("x")]);
        assert!(matches!(validate(&manifest), Err(ValidationError::MissingOption { .. })));
    }

    #[test]
    fn test_revalidation_is_stable() {
        let mut manifest = Manifest::new(vec![
            generate("a"),
            Job::new("b", JobType::Animate, "b.mp4")
                .with_option("image", "b.png")
                .with_option("prompt", "wave"),
        ]);
        assert!(manifest.prepare().is_ok());
        assert!(manifest.prepare().is_ok());
        assert!(manifest.validate().is_ok());
    }
}
