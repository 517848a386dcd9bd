//! Background actions declared by steps.
//!
//! An async action runs alongside the steps of a task (sensor recorders,
//! one-shot service calls). Its active window is expressed with step
//! identifiers; when a declaration leaves them out, the window is inferred from
//! the section that encloses the declaring step.

use serde::{Deserialize, Serialize};

/// Async action declaration, tagged by `type` in authored documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AsyncActionConfiguration {
    /// Accelerometer, gyroscope, and attitude recorder.
    Motion(RecorderConfiguration),
    /// GPS distance recorder.
    Distance(RecorderConfiguration),
    /// Audio level recorder.
    Microphone(RecorderConfiguration),
    /// One-shot weather lookup started with the task.
    Weather(AsyncActionBase),
}

/// Fields shared by every recorder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfiguration {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_step_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_step_identifier: Option<String>,
}

/// Fields shared by actions that only have a start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncActionBase {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_step_identifier: Option<String>,
}

impl RecorderConfiguration {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            start_step_identifier: None,
            stop_step_identifier: None,
        }
    }
}

impl AsyncActionBase {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            start_step_identifier: None,
        }
    }
}

impl AsyncActionConfiguration {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Motion(recorder) | Self::Distance(recorder) | Self::Microphone(recorder) => &recorder.identifier,
            Self::Weather(action) => &action.identifier,
        }
    }

    /// Canonical `type` tag of this action.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Motion(_) => "motion",
            Self::Distance(_) => "distance",
            Self::Microphone(_) => "microphone",
            Self::Weather(_) => "weather",
        }
    }

    pub fn start_step_identifier(&self) -> Option<&str> {
        match self {
            Self::Motion(recorder) | Self::Distance(recorder) | Self::Microphone(recorder) => recorder.start_step_identifier.as_deref(),
            Self::Weather(action) => action.start_step_identifier.as_deref(),
        }
    }

    /// Stop identifier; always `None` for actions that are not recorders.
    pub fn stop_step_identifier(&self) -> Option<&str> {
        self.recorder().and_then(|recorder| recorder.stop_step_identifier.as_deref())
    }

    pub fn is_recorder(&self) -> bool {
        self.recorder().is_some()
    }

    /// Recorder fields, when this action is a recorder.
    pub fn recorder(&self) -> Option<&RecorderConfiguration> {
        match self {
            Self::Motion(recorder) | Self::Distance(recorder) | Self::Microphone(recorder) => Some(recorder),
            Self::Weather(_) => None,
        }
    }

    /// Returns a copy with the start identifier replaced.
    pub fn copy_with_start_step_identifier(&self, start_step_identifier: Option<String>) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Self::Motion(recorder) | Self::Distance(recorder) | Self::Microphone(recorder) => {
                recorder.start_step_identifier = start_step_identifier;
            }
            Self::Weather(action) => action.start_step_identifier = start_step_identifier,
        }
        copy
    }

    /// Returns a copy with the stop identifier replaced. Non-recorders are returned unchanged.
    pub fn copy_with_stop_step_identifier(&self, stop_step_identifier: Option<String>) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Self::Motion(recorder) | Self::Distance(recorder) | Self::Microphone(recorder) => {
                recorder.stop_step_identifier = stop_step_identifier;
            }
            Self::Weather(_) => {}
        }
        copy
    }
}
