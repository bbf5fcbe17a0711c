//! The mutation watcher.
//!
//! Drains the document's mutation log and runs the tracker on exactly the
//! newly inserted elements — never the whole document — so re-scan cost is
//! bounded by the delta. Tracking can itself insert elements (content
//! re-renders), so draining loops until the log is quiet, mirroring
//! successive observer callbacks.
//!
//! The watcher never removes bindings for removed nodes: stale bindings
//! keep writing into detached subtrees until a full reset.

use crate::engine::EngineInner;
use crate::error::EngineError;

impl EngineInner {
    /// Process pending insertions. Armed by `start`; before that, pending
    /// mutations are left in place and nothing is tracked.
    pub(crate) fn flush(&self) -> Result<usize, EngineError> {
        let doc = self.require_document()?;
        if !self.watching.get() {
            return Ok(0);
        }
        let mut created = 0;
        loop {
            let inserted = doc.take_mutations();
            if inserted.is_empty() {
                break;
            }
            self.logger().debug(&format!(
                "{} new elements were created in the document",
                inserted.len()
            ));
            created += self.track(&inserted)?;
        }
        Ok(created)
    }
}
