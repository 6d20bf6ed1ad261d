// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replaying an ordered commit list into the current document value.
//!
//! The replay is a resumable step machine: each [`Replay::step`] performs
//! exactly one unit of work (decode one commit, apply one patch) so a long
//! history never monopolizes a cooperative scheduler. [`reconstruct`]
//! drives the machine and yields back to the runtime between steps.
//!
//! Decoded commit data is classified with a shape heuristic, not a type
//! tag: if the first decoded value looks like a list of JSON-Patch
//! operations the stream starts from an empty document, otherwise the
//! first value is the base document content. A base document that happens
//! to carry exactly the fields `op`, `path` and `value` is therefore
//! misclassified as a one-element patch list; see [`looks_like_patch`].

use json_patch::Patch;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use rivulet_core::CodecError;
use rivulet_core::cbor::decode_dag_cbor;
use rivulet_core::encoding::decode_block;
use rivulet_core::transport::CommitEntry;

/// Outcome of one unit of replay work.
#[derive(Clone, PartialEq, Debug)]
pub enum Step {
    /// An anchor commit carried no content block and was skipped.
    Skipped { index: usize },

    /// One commit's content block was decoded.
    Decoded { index: usize },

    /// One patch was applied to the running document.
    Applied { index: usize },

    /// Replay finished; this is the current document value.
    Done(Value),
}

enum Phase {
    Decoding { next: usize },
    Applying { next: usize },
    Finished,
}

/// Resumable replay of a stream's commit list.
pub struct Replay {
    entries: Vec<CommitEntry>,
    patches: Vec<Value>,
    document: Value,
    phase: Phase,
}

impl Replay {
    pub fn new(entries: Vec<CommitEntry>) -> Self {
        Self {
            entries,
            patches: Vec::new(),
            document: Value::Object(Map::new()),
            phase: Phase::Decoding { next: 0 },
        }
    }

    /// Perform one unit of work.
    ///
    /// Decode errors abort the whole reconstruction with the failing commit
    /// index; a broken commit is never skipped best-effort, since that
    /// would produce a document that looks valid but is wrong.
    pub fn step(&mut self) -> Result<Step, ReplayError> {
        match self.phase {
            Phase::Decoding { next } => {
                if next >= self.entries.len() {
                    self.classify();
                    return self.step();
                }

                self.phase = Phase::Decoding { next: next + 1 };
                let entry = &self.entries[next];
                match &entry.block {
                    None => {
                        debug!(index = next, cid = %entry.cid, "skipping anchor commit");
                        Ok(Step::Skipped { index: next })
                    }
                    Some(block) => {
                        let bytes = decode_block(block)
                            .map_err(|source| ReplayError::BlockEncoding { index: next, source })?;
                        let body: Value = decode_dag_cbor(&bytes)
                            .map_err(|source| ReplayError::BlockCodec { index: next, source })?;
                        let data = body
                            .get("data")
                            .cloned()
                            .unwrap_or_else(|| Value::Object(Map::new()));
                        self.patches.push(data);
                        Ok(Step::Decoded { index: next })
                    }
                }
            }
            Phase::Applying { next } => {
                if next >= self.patches.len() {
                    self.phase = Phase::Finished;
                    return Ok(Step::Done(std::mem::take(&mut self.document)));
                }

                self.phase = Phase::Applying { next: next + 1 };
                let raw = self.patches[next].take();
                // A commit without a data field carries the empty patch
                // `{}`; an op-shaped map is treated as a one-element patch
                // list, matching the classification heuristic.
                let raw = match raw {
                    Value::Object(map) if map.is_empty() => Value::Array(Vec::new()),
                    raw if op_shaped(&raw) => Value::Array(vec![raw]),
                    raw => raw,
                };
                let patch: Patch = serde_json::from_value(raw)
                    .map_err(|source| ReplayError::InvalidPatch { index: next, source })?;
                json_patch::patch(&mut self.document, &patch)
                    .map_err(|source| ReplayError::PatchFailed { index: next, source })?;
                debug!(index = next, "applied patch");
                Ok(Step::Applied { index: next })
            }
            Phase::Finished => Err(ReplayError::Exhausted),
        }
    }

    /// Decide whether the first decoded value is a diff or the base
    /// document, then switch to the applying phase.
    fn classify(&mut self) {
        if !self.patches.is_empty() && !looks_like_patch(&self.patches[0]) {
            self.document = self.patches.remove(0);
        }
        self.phase = Phase::Applying { next: 0 };
    }
}

/// Whether a decoded commit value is shaped like a JSON-Patch.
///
/// True for an array whose every element is an object with exactly the
/// fields `op`, `path` and `value`, and for a bare object with exactly
/// those fields. This is a heuristic: base document content of that exact
/// shape is misclassified as a patch. An empty array counts as a patch.
pub fn looks_like_patch(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(op_shaped),
        Value::Object(_) => op_shaped(value),
        _ => false,
    }
}

fn op_shaped(value: &Value) -> bool {
    match value.as_object() {
        Some(map) => {
            map.len() == 3
                && map.contains_key("op")
                && map.contains_key("path")
                && map.contains_key("value")
        }
        None => false,
    }
}

/// Replay the full commit list, yielding to the scheduler between steps.
pub async fn reconstruct(entries: Vec<CommitEntry>) -> Result<Value, ReplayError> {
    let mut replay = Replay::new(entries);
    loop {
        match replay.step()? {
            Step::Done(document) => return Ok(document),
            _ => tokio::task::yield_now().await,
        }
    }
}

/// Error types for stream replay.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// A linked content block is not valid base64.
    #[error("commit {index}: invalid base64 in linked block: {source}")]
    BlockEncoding {
        index: usize,
        source: base64::DecodeError,
    },

    /// A linked content block is not valid linked-data bytes.
    #[error("commit {index}: {source}")]
    BlockCodec { index: usize, source: CodecError },

    /// A decoded value is not a valid RFC 6902 operation list.
    #[error("patch {index}: not a valid json-patch document: {source}")]
    InvalidPatch {
        index: usize,
        source: serde_json::Error,
    },

    /// A patch did not apply to the running document.
    #[error("patch {index}: {source}")]
    PatchFailed {
        index: usize,
        source: json_patch::PatchError,
    },

    /// `step()` was called after the replay finished.
    #[error("replay already finished")]
    Exhausted,
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use rivulet_core::cbor::encode_dag_cbor;
    use rivulet_core::encoding::encode_block;
    use rivulet_core::transport::CommitEntry;

    use super::{Replay, ReplayError, Step, looks_like_patch, reconstruct};

    fn entry(index: usize, body: Value) -> CommitEntry {
        let bytes = encode_dag_cbor(&body).unwrap();
        CommitEntry::new(format!("commit-{index}"), encode_block(&bytes))
    }

    #[test]
    fn patch_shape_detection() {
        assert!(looks_like_patch(&json!([
            {"op": "add", "path": "/a", "value": 1},
            {"op": "remove", "path": "/b", "value": null},
        ])));
        assert!(looks_like_patch(&json!([])));

        // The documented misclassification: a bare op-shaped map counts as
        // a one-element patch list.
        assert!(looks_like_patch(&json!({"op": "x", "path": "y", "value": "z"})));

        assert!(!looks_like_patch(&json!({"a": 1})));
        assert!(!looks_like_patch(&json!({})));
        assert!(!looks_like_patch(&json!([{"op": "add", "path": "/a"}])));
        assert!(!looks_like_patch(&json!(
            [{"op": "add", "path": "/a", "value": 1, "extra": true}]
        )));
        assert!(!looks_like_patch(&json!("base content")));
    }

    #[tokio::test]
    async fn empty_commit_list_yields_empty_document() {
        let document = reconstruct(vec![]).await.unwrap();
        assert_eq!(document, json!({}));
    }

    #[tokio::test]
    async fn genesis_only() {
        let entries = vec![entry(0, json!({"header": {}, "data": {"a": 1}}))];
        assert_eq!(reconstruct(entries).await.unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn genesis_without_data_yields_empty_document() {
        let entries = vec![entry(0, json!({"header": {}}))];
        assert_eq!(reconstruct(entries).await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn genesis_and_update() {
        let entries = vec![
            entry(0, json!({"header": {}, "data": {"a": 1}})),
            entry(
                1,
                json!({"header": {}, "data": [{"op": "replace", "path": "/a", "value": 2}]}),
            ),
        ];
        assert_eq!(reconstruct(entries).await.unwrap(), json!({"a": 2}));
    }

    #[tokio::test]
    async fn dataless_commit_mid_stream_applies_as_empty_patch() {
        let entries = vec![
            entry(0, json!({"header": {}, "data": {"a": 1}})),
            entry(1, json!({"header": {}})),
            entry(
                2,
                json!({"header": {}, "data": [{"op": "replace", "path": "/a", "value": 2}]}),
            ),
        ];
        assert_eq!(reconstruct(entries).await.unwrap(), json!({"a": 2}));
    }

    #[tokio::test]
    async fn trailing_dataless_commit_is_a_noop() {
        let entries = vec![
            entry(0, json!({"header": {}, "data": {"a": 1}})),
            entry(1, json!({"header": {}})),
        ];
        assert_eq!(reconstruct(entries).await.unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn anchor_commits_are_skipped() {
        let entries = vec![
            entry(0, json!({"header": {}, "data": {"a": 1}})),
            CommitEntry::anchor("commit-anchor"),
            entry(
                2,
                json!({"header": {}, "data": [{"op": "replace", "path": "/a", "value": 2}]}),
            ),
        ];
        assert_eq!(reconstruct(entries).await.unwrap(), json!({"a": 2}));
    }

    #[tokio::test]
    async fn stream_starting_with_patches_begins_empty() {
        let entries = vec![
            entry(0, json!({"header": {}, "data": [{"op": "add", "path": "/a", "value": 1}]})),
            entry(1, json!({"header": {}, "data": [{"op": "add", "path": "/b", "value": 2}]})),
        ];
        assert_eq!(reconstruct(entries).await.unwrap(), json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn op_shaped_base_document_is_misclassified() {
        // Known limitation of the shape heuristic: this base document is
        // applied as a patch instead of being taken verbatim.
        let entries = vec![entry(
            0,
            json!({"header": {}, "data": {"op": "add", "path": "/x", "value": 1}}),
        )];
        assert_eq!(reconstruct(entries).await.unwrap(), json!({"x": 1}));

        // With an unknown op name the misclassified value is not even a
        // valid patch, so the replay aborts rather than returning the base
        // document.
        let entries = vec![entry(
            0,
            json!({"header": {}, "data": {"op": "x", "path": "y", "value": "z"}}),
        )];
        assert!(matches!(
            reconstruct(entries).await,
            Err(ReplayError::InvalidPatch { index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn broken_commit_aborts_the_replay() {
        let entries = vec![
            entry(0, json!({"header": {}, "data": {"a": 1}})),
            CommitEntry::new("commit-broken", "%%% not base64 %%%"),
        ];
        assert!(matches!(
            reconstruct(entries).await,
            Err(ReplayError::BlockEncoding { index: 1, .. })
        ));

        let entries = vec![CommitEntry::new(
            "commit-garbage",
            rivulet_core::encoding::encode_block(&[0xff, 0x00, 0x13, 0x37]),
        )];
        assert!(matches!(
            reconstruct(entries).await,
            Err(ReplayError::BlockCodec { index: 0, .. })
        ));
    }

    #[test]
    fn step_machine_granularity() {
        let entries = vec![
            entry(0, json!({"header": {}, "data": {"a": 1}})),
            CommitEntry::anchor("commit-anchor"),
            entry(
                2,
                json!({"header": {}, "data": [{"op": "replace", "path": "/a", "value": 2}]}),
            ),
        ];
        let mut replay = Replay::new(entries);

        assert_eq!(replay.step().unwrap(), Step::Decoded { index: 0 });
        assert_eq!(replay.step().unwrap(), Step::Skipped { index: 1 });
        assert_eq!(replay.step().unwrap(), Step::Decoded { index: 2 });
        // The base document is consumed by classification, leaving one
        // patch to apply.
        assert_eq!(replay.step().unwrap(), Step::Applied { index: 0 });
        assert_eq!(replay.step().unwrap(), Step::Done(json!({"a": 2})));
        assert!(matches!(replay.step(), Err(ReplayError::Exhausted)));
    }
}
