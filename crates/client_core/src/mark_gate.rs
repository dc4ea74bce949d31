use shared::{
    domain::{AttendanceOutcome, SubjectId},
    protocol::MarkResponse,
};

use crate::{device::CaptureFrame, error::ValidationError, events::Notice};

/// Submit is enabled only when subject, frame and outcome are all present.
pub fn submit_enabled(
    subject: Option<&SubjectId>,
    frame: Option<&CaptureFrame>,
    outcome: Option<AttendanceOutcome>,
) -> bool {
    subject.is_some() && frame.is_some() && outcome.is_some()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkGateSnapshot {
    pub subject: Option<SubjectId>,
    pub outcome: Option<AttendanceOutcome>,
    pub has_frame: bool,
    pub enabled: bool,
}

/// A complete selection, ready to be sent.
#[derive(Debug, Clone)]
pub struct MarkSubmission {
    pub subject: SubjectId,
    pub outcome: AttendanceOutcome,
    pub frame: CaptureFrame,
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceMarkGate {
    subject: Option<SubjectId>,
    outcome: Option<AttendanceOutcome>,
    frame: Option<CaptureFrame>,
    enabled: bool,
}

impl AttendanceMarkGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Blank ids count as no selection.
    pub fn select_subject(&mut self, subject: Option<SubjectId>) -> bool {
        self.subject = subject.filter(|subject| !subject.is_blank());
        self.recompute()
    }

    pub fn select_outcome(&mut self, outcome: Option<AttendanceOutcome>) -> bool {
        self.outcome = outcome;
        self.recompute()
    }

    pub fn set_frame(&mut self, frame: Option<CaptureFrame>) -> bool {
        self.frame = frame;
        self.recompute()
    }

    /// Takes the selection out of the gate, leaving every input cleared.
    ///
    /// An incomplete selection is refused without touching any input.
    pub fn take_submission(&mut self) -> Result<MarkSubmission, ValidationError> {
        if !self.enabled {
            return Err(ValidationError::IncompleteMarkSelection);
        }
        match (self.subject.take(), self.outcome.take(), self.frame.take()) {
            (Some(subject), Some(outcome), Some(frame)) => {
                self.recompute();
                Ok(MarkSubmission {
                    subject,
                    outcome,
                    frame,
                })
            }
            _ => {
                self.recompute();
                Err(ValidationError::IncompleteMarkSelection)
            }
        }
    }

    pub fn clear(&mut self) {
        self.subject = None;
        self.outcome = None;
        self.frame = None;
        self.recompute();
    }

    pub fn snapshot(&self) -> MarkGateSnapshot {
        MarkGateSnapshot {
            subject: self.subject.clone(),
            outcome: self.outcome,
            has_frame: self.frame.is_some(),
            enabled: self.enabled,
        }
    }

    fn recompute(&mut self) -> bool {
        self.enabled = submit_enabled(self.subject.as_ref(), self.frame.as_ref(), self.outcome);
        self.enabled
    }
}

/// Maps the service's result tag to the notice shown to the user.
pub fn mark_notice(response: &MarkResponse) -> Notice {
    let status = response.mark_status();
    if status.is_recorded() {
        let label = response.student_id.as_deref().unwrap_or("Unknown");
        Notice::success(format!("Marked {} for {label}", response.status))
    } else if response.status.is_empty() {
        Notice::warning("Uncertain")
    } else {
        Notice::warning(response.status.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{device::JPEG_MIME, events::NoticeLevel};

    fn frame() -> CaptureFrame {
        CaptureFrame {
            bytes: vec![0xff, 0xd8],
            mime_type: JPEG_MIME.into(),
            quality: 0.8,
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn only_the_complete_combination_enables_submit() {
        let subject = SubjectId::new("S1");
        let captured = frame();
        let mut enabled = 0;
        for mask in 0u8..8 {
            let s = (mask & 1 != 0).then_some(&subject);
            let f = (mask & 2 != 0).then_some(&captured);
            let o = (mask & 4 != 0).then_some(AttendanceOutcome::Late);
            let result = submit_enabled(s, f, o);
            assert_eq!(result, mask == 7, "mask {mask:03b}");
            if result {
                enabled += 1;
            }
        }
        assert_eq!(enabled, 1);
    }

    #[test]
    fn gate_recomputes_after_each_mutation() {
        let mut gate = AttendanceMarkGate::new();
        assert!(!gate.select_subject(Some(SubjectId::new("S1"))));
        assert!(!gate.select_outcome(Some(AttendanceOutcome::Present)));
        assert!(gate.set_frame(Some(frame())));
        assert!(!gate.set_frame(None));
        assert!(!gate.snapshot().enabled);
    }

    #[test]
    fn blank_subject_does_not_count_as_selected() {
        let mut gate = AttendanceMarkGate::new();
        gate.select_outcome(Some(AttendanceOutcome::Absent));
        gate.set_frame(Some(frame()));
        assert!(!gate.select_subject(Some(SubjectId::new("  "))));
        assert_eq!(gate.snapshot().subject, None);
    }

    #[test]
    fn incomplete_take_leaves_inputs_untouched() {
        let mut gate = AttendanceMarkGate::new();
        gate.select_subject(Some(SubjectId::new("S1")));
        gate.select_outcome(Some(AttendanceOutcome::Present));

        let err = gate.take_submission().expect_err("frame missing");
        assert_eq!(err, ValidationError::IncompleteMarkSelection);
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.subject, Some(SubjectId::new("S1")));
        assert_eq!(snapshot.outcome, Some(AttendanceOutcome::Present));
    }

    #[test]
    fn complete_take_clears_every_input() {
        let mut gate = AttendanceMarkGate::new();
        gate.select_subject(Some(SubjectId::new("S1")));
        gate.select_outcome(Some(AttendanceOutcome::Present));
        gate.set_frame(Some(frame()));

        let submission = gate.take_submission().expect("complete");
        assert_eq!(submission.subject, SubjectId::new("S1"));
        assert_eq!(
            gate.snapshot(),
            MarkGateSnapshot {
                subject: None,
                outcome: None,
                has_frame: false,
                enabled: false,
            }
        );
    }

    #[test]
    fn notices_follow_the_result_tag() {
        let present = MarkResponse {
            status: "Present".into(),
            student_id: Some("S1".into()),
            confidence: Some(0.93),
        };
        let notice = mark_notice(&present);
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Marked Present for S1");

        let debounced = MarkResponse {
            status: "Debounced".into(),
            student_id: None,
            confidence: None,
        };
        assert_eq!(mark_notice(&debounced).message, "Marked Debounced for Unknown");

        let no_face = MarkResponse {
            status: "NoFace".into(),
            student_id: None,
            confidence: None,
        };
        let notice = mark_notice(&no_face);
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.message, "NoFace");

        let empty = MarkResponse {
            status: String::new(),
            student_id: None,
            confidence: None,
        };
        assert_eq!(mark_notice(&empty).message, "Uncertain");
    }
}
