//! Resume gate: output suppression until a named part boundary.
//!
//! When an intermediate snapshot name is supplied, the run re-walks the
//! whole input but only the sub-streams *after* that snapshot may reach the
//! concatenated sink. The gate is a four-state machine advanced at every
//! split boundary, keyed on the snapshot component of the freshly minted
//! BEGIN. Suppressed writes report success without emitting bytes, so the
//! checksum accumulators and counters advance exactly as in an ungated run.

/// Gate position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateStage {
    /// Before the first boundary; the leading header passes through.
    Leading,
    /// Replaying already-received sub-streams; writes are swallowed.
    Skipping,
    /// The named boundary was seen; the next boundary opens the gate.
    Armed,
    /// Past the named snapshot; writes pass through again.
    Resumed,
}

/// Output-enable state machine for resumed runs.
#[derive(Clone, Debug)]
pub struct OutputGate {
    resume_snapshot: Option<String>,
    stage: GateStage,
}

impl OutputGate {
    /// Creates a gate. With no resume snapshot the gate never suppresses.
    #[must_use]
    pub fn new(resume_snapshot: Option<String>) -> Self {
        Self {
            resume_snapshot,
            stage: GateStage::Leading,
        }
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> GateStage {
        self.stage
    }

    /// Whether writes are currently swallowed.
    #[must_use]
    pub fn writes_suppressed(&self) -> bool {
        matches!(self.stage, GateStage::Skipping | GateStage::Armed)
    }

    /// Advances the gate at a split boundary.
    ///
    /// `snapshot` is the snapshot component of the BEGIN about to be
    /// written. Matching the configured name arms the gate; the boundary
    /// after an armed gate resumes output; the first boundary of a gated
    /// run closes it.
    pub fn observe_boundary(&mut self, snapshot: &str) {
        let Some(target) = &self.resume_snapshot else {
            return;
        };
        if snapshot == target {
            // The named snapshot is being replicated; output starts with
            // the one after it.
            self.stage = GateStage::Armed;
        } else if self.stage == GateStage::Leading {
            self.stage = GateStage::Skipping;
        } else if self.stage == GateStage::Armed {
            self.stage = GateStage::Resumed;
        }
    }
}
