use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CronError, Result};

/// One phase of a compute job. Everything beyond the asset list is opaque to
/// this crate and passed through to the job service untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPhase {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<String>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// An externally supplied job definition.
///
/// The coordinator validates the name and augments asset lists, nothing more;
/// phase contents are the job owner's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub phases: Vec<JobPhase>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl JobDefinition {
    /// Validate the definition against the configured job name and append the
    /// configured asset object to every phase's asset list.
    ///
    /// A present `name` must match `job_name` exactly; an absent one is set
    /// to it. A definition with no phases is rejected.
    pub fn validate_and_augment(
        &mut self,
        job_name: &str,
        asset_object: Option<&str>,
    ) -> Result<()> {
        match &self.name {
            Some(name) if name != job_name => {
                return Err(CronError::Validation(format!(
                    "definition name {:?} does not match configured job name {:?}",
                    name, job_name
                )));
            }
            Some(_) => {}
            None => self.name = Some(job_name.to_string()),
        }

        if self.phases.is_empty() {
            return Err(CronError::Validation(
                "definition has no phases".to_string(),
            ));
        }

        if let Some(asset) = asset_object {
            for phase in &mut self.phases {
                if !phase.assets.iter().any(|a| a == asset) {
                    phase.assets.push(asset.to_string());
                }
            }
        }

        Ok(())
    }
}
