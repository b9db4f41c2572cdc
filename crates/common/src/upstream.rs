//! Wire types of the Jenkins JSON API

use serde::{Deserialize, Serialize};

/// `GET <job>/api/json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub builds: Vec<BuildReference>,
}

/// Pointer to a build's detail resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReference {
    pub url: String,
}

/// `GET <build>/api/json`
#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    pub url: String,
    pub number: i64,
    #[serde(default)]
    pub result: BuildResult,
    /// Epoch milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artifact {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "relativePath")]
    pub relative_path: String,
}

/// Build result. Jenkins reports `null` while a build is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "Option<String>")]
pub enum BuildResult {
    Success,
    Failure,
    #[default]
    Unknown,
}

impl From<Option<String>> for BuildResult {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("SUCCESS") => BuildResult::Success,
            Some("FAILURE") | Some("UNSTABLE") | Some("ABORTED") => BuildResult::Failure,
            _ => BuildResult::Unknown,
        }
    }
}

/// `GET <build>/git/api/json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitData {
    #[serde(rename = "lastBuiltRevision")]
    pub last_built_revision: Option<GitRevision>,
    #[serde(rename = "remoteUrls", default)]
    pub remote_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitRevision {
    #[serde(rename = "SHA1")]
    pub sha1: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_deserialization() {
        let json = r#"{
            "_class": "hudson.model.FreeStyleBuild",
            "url": "http://ci.local/job/demo/10/",
            "number": 10,
            "result": "SUCCESS",
            "timestamp": 1546300800000,
            "artifacts": [
                {"displayPath": "b.zip", "fileName": "b.zip", "relativePath": "out/b.zip"}
            ]
        }"#;

        let build: Build = serde_json::from_str(json).unwrap();
        assert_eq!(build.number, 10);
        assert_eq!(build.result, BuildResult::Success);
        assert_eq!(build.artifacts[0].relative_path, "out/b.zip");
    }

    #[test]
    fn test_running_build_has_unknown_result() {
        let json = r#"{"url": "u", "number": 3, "result": null, "timestamp": 0}"#;
        let build: Build = serde_json::from_str(json).unwrap();
        assert_eq!(build.result, BuildResult::Unknown);
        assert!(build.artifacts.is_empty());
    }

    #[test]
    fn test_result_mapping() {
        assert_eq!(BuildResult::from(Some("UNSTABLE".into())), BuildResult::Failure);
        assert_eq!(BuildResult::from(Some("NOT_BUILT".into())), BuildResult::Unknown);
        assert_eq!(
            serde_json::to_value(BuildResult::Failure).unwrap(),
            serde_json::json!("FAILURE")
        );
    }

    #[test]
    fn test_job_without_builds() {
        let job: Job = serde_json::from_str(r#"{"name": "demo"}"#).unwrap();
        assert!(job.builds.is_empty());
    }
}
