//! Request/response capture for generating regression fixtures.
//!
//! When enabled, every completed request is written out as a numbered case:
//! successes as `1`, `2`, … and errors as `1_error`, `2_error`, …. Each case
//! is two artifacts, the raw request and the expected `result` (or `error`
//! object). On shutdown a `tests.yaml` manifest for the pyresttest runner
//! enumerates every captured case.
//!
//! Capture only observes: sink failures are logged and never reach the client.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chainrpc_api::RpcResponse;
use serde_json::Value;
use tracing::{info, warn};

/// Name of the manifest written by [`FixtureRecorder::finish`].
pub const MANIFEST_FILE: &str = "tests.yaml";

// ---------------------------------------------------------------------------
// FixtureError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Invalid directory name (empty).")]
    EmptyPath,

    #[error("fixture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fixture encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// FixtureSink
// ---------------------------------------------------------------------------

/// Where captured cases go.
pub trait FixtureSink: Send + Sync {
    /// Persist one case: the raw request and the expected outcome.
    fn write_case(&self, name: &str, request: &Value, expected: &Value)
        -> Result<(), FixtureError>;

    /// Persist the manifest listing every case.
    fn write_index(&self, manifest: &str) -> Result<(), FixtureError>;

    /// Location the manifest refers to when templating expected files.
    fn location(&self) -> String;
}

/// A [`FixtureSink`] writing `<name>.json` / `<name>.json.pat` files into a
/// directory.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Prepare `dir` for capture. Any existing content is removed first.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(FixtureError::EmptyPath);
        }
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FixtureSink for DirectorySink {
    fn write_case(
        &self,
        name: &str,
        request: &Value,
        expected: &Value,
    ) -> Result<(), FixtureError> {
        std::fs::write(
            self.dir.join(format!("{name}.json")),
            serde_json::to_vec(request)?,
        )?;
        std::fs::write(
            self.dir.join(format!("{name}.json.pat")),
            serde_json::to_vec(expected)?,
        )?;
        Ok(())
    }

    fn write_index(&self, manifest: &str) -> Result<(), FixtureError> {
        std::fs::write(self.dir.join(MANIFEST_FILE), manifest)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// FixtureRecorder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Counters {
    successes: u32,
    errors: u32,
    finished: bool,
}

/// Numbers captured cases and hands them to a [`FixtureSink`].
pub struct FixtureRecorder {
    sink: Box<dyn FixtureSink>,
    counters: Mutex<Counters>,
}

impl FixtureRecorder {
    pub fn new(sink: Box<dyn FixtureSink>) -> Self {
        Self {
            sink,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Capture one request/response pair.
    pub fn record(&self, request: &Value, response: &RpcResponse) {
        let name = {
            let mut counters = self.counters.lock().unwrap_or_else(|p| p.into_inner());
            if response.is_error() {
                counters.errors += 1;
                format!("{}_error", counters.errors)
            } else {
                counters.successes += 1;
                counters.successes.to_string()
            }
        };

        let expected = match &response.error {
            Some(error) => serde_json::to_value(error).unwrap_or(Value::Null),
            None => response.result.clone().unwrap_or(Value::Null),
        };

        if let Err(e) = self.sink.write_case(&name, request, &expected) {
            warn!(case = %name, "failed to capture fixture: {e}");
        }
    }

    /// `(successes, errors)` captured so far.
    pub fn counts(&self) -> (u32, u32) {
        let counters = self.counters.lock().unwrap_or_else(|p| p.into_inner());
        (counters.successes, counters.errors)
    }

    /// Write the manifest once, if anything was captured. Later calls do nothing.
    pub fn finish(&self) {
        let (successes, errors) = {
            let mut counters = self.counters.lock().unwrap_or_else(|p| p.into_inner());
            if counters.finished {
                return;
            }
            counters.finished = true;
            (counters.successes, counters.errors)
        };
        if successes + errors == 0 {
            return;
        }

        let manifest = render_manifest(&self.sink.location(), successes, errors);
        match self.sink.write_index(&manifest) {
            Ok(()) => info!(successes, errors, "fixture manifest written"),
            Err(e) => warn!("failed to write fixture manifest: {e}"),
        }
    }
}

impl Drop for FixtureRecorder {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Render the pyresttest manifest for `successes` ok cases and `errors`
/// error cases stored under `location`.
pub fn render_manifest(location: &str, successes: u32, errors: u32) -> String {
    let mut out = String::from(
        "---\n\
         - config:\n\
         \x20 - testset: \"API Tests\"\n\
         \x20 - generators:\n\
         \x20   - test_id: {type: 'number_sequence', start: 1}\n\
         \x20   - error_id: {type: 'number_sequence', start: 1}\n\
         \n\
         - base_test: &base_test\n\
         \x20 - generator_binds:\n\
         \x20   - test_id: test_id\n\
         \x20 - url: \"/rpc\"\n\
         \x20 - method: \"POST\"\n\
         \x20 - validators:\n\
         \x20   - extract_test: {jsonpath_mini: \"error\", test: \"not_exists\"}\n\
         \x20   - extract_test: {jsonpath_mini: \"result\", test: \"exists\"}\n",
    );
    out.push_str(&format!(
        "    - json_file_validator: {{jsonpath_mini: \"result\", comparator: \"json_compare\", \
         expected: {{template: '{location}/$test_id'}}}}\n\n"
    ));

    out.push_str(
        "- base_error_test: &base_error_test\n\
         \x20 - generator_binds:\n\
         \x20   - error_id: error_id\n\
         \x20 - url: \"/rpc\"\n\
         \x20 - method: \"POST\"\n\
         \x20 - validators:\n\
         \x20   - extract_test: {jsonpath_mini: \"error\", test: \"exists\"}\n",
    );
    out.push_str(&format!(
        "    - json_file_validator: {{jsonpath_mini: \"error\", comparator: \"json_compare\", \
         expected: {{template: '{location}/${{error_id}}_error'}}}}\n\n"
    ));

    for i in 1..=successes {
        out.push_str(&format!(
            "- test:\n  - body: {{file: \"{i}.json\"}}\n  - name: \"test{i}\"\n  - <<: *base_test\n\n"
        ));
    }
    for i in 1..=errors {
        out.push_str(&format!(
            "- test:\n  - body: {{file: \"{i}_error.json\"}}\n  - name: \"test{i}_error\"\n  - <<: *base_error_test\n\n"
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chainrpc_api::{RequestId, RpcError};
    use serde_json::json;

    fn ok(result: Value) -> RpcResponse {
        RpcResponse::success(Some(RequestId::Number(1)), result)
    }

    fn err() -> RpcResponse {
        RpcResponse::failure(None, RpcError::method_not_found("Could not find network x"))
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(DirectorySink::create(""), Err(FixtureError::EmptyPath)));
    }

    #[test]
    fn create_clears_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("fixtures");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stale.json"), "{}").unwrap();

        let sink = DirectorySink::create(&dir).unwrap();
        assert!(sink.dir().exists());
        assert!(!dir.join("stale.json").exists());
    }

    #[test]
    fn cases_are_numbered_separately() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("fx");
        let recorder = FixtureRecorder::new(Box::new(DirectorySink::create(&dir).unwrap()));

        let request = json!({ "jsonrpc": "2.0", "method": "chain.ping", "id": 1 });
        recorder.record(&request, &ok(json!("pong")));
        recorder.record(&request, &err());
        recorder.record(&request, &ok(json!({ "n": 2 })));
        assert_eq!(recorder.counts(), (2, 1));

        let read = |name: &str| -> Value {
            serde_json::from_slice(&std::fs::read(dir.join(name)).unwrap()).unwrap()
        };
        assert_eq!(read("1.json"), request);
        assert_eq!(read("1.json.pat"), json!("pong"));
        assert_eq!(read("2.json.pat"), json!({ "n": 2 }));
        assert_eq!(read("1_error.json.pat")["code"], json!(-32601));
    }

    #[test]
    fn finish_writes_manifest_once_when_cases_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("fx");
        let recorder = FixtureRecorder::new(Box::new(DirectorySink::create(&dir).unwrap()));
        recorder.record(&json!({}), &ok(json!(1)));
        recorder.record(&json!({}), &err());
        recorder.finish();

        let manifest = std::fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap();
        assert!(manifest.contains("body: {file: \"1.json\"}"));
        assert!(manifest.contains("body: {file: \"1_error.json\"}"));
        assert!(manifest.contains("url: \"/rpc\""));

        std::fs::remove_file(dir.join(MANIFEST_FILE)).unwrap();
        recorder.finish();
        assert!(!dir.join(MANIFEST_FILE).exists());
    }

    #[test]
    fn nothing_captured_means_no_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("fx");
        let recorder = FixtureRecorder::new(Box::new(DirectorySink::create(&dir).unwrap()));
        drop(recorder);
        assert!(!dir.join(MANIFEST_FILE).exists());
    }

    #[test]
    fn manifest_lists_every_case() {
        let m = render_manifest("/tmp/fx", 3, 2);
        assert_eq!(m.matches("- test:").count(), 5);
        assert!(m.contains("template: '/tmp/fx/$test_id'"));
        assert!(m.contains("name: \"test2_error\""));
        assert!(m.contains("template: '/tmp/fx/${error_id}_error'"));
        assert!(m.ends_with("- <<: *base_error_test\n\n"));
    }
}
