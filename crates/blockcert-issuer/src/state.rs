//! Per-certificate lifecycle.

use std::fmt;

/// Where a certificate is in the issuance pipeline.
///
/// The happy path is `Unsigned → Committed → DraftBuilt → Signed → Verified
/// → Broadcast`. `Broadcast` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CertificateState {
    Unsigned,
    Committed,
    DraftBuilt,
    Signed,
    Verified,
    Broadcast,
    Failed,
}

impl CertificateState {
    /// The state that follows this one on the happy path.
    pub fn next(self) -> Option<CertificateState> {
        use CertificateState::*;
        match self {
            Unsigned => Some(Committed),
            Committed => Some(DraftBuilt),
            DraftBuilt => Some(Signed),
            Signed => Some(Verified),
            Verified => Some(Broadcast),
            Broadcast | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CertificateState::Broadcast | CertificateState::Failed)
    }

    /// Whether moving to `to` is allowed: one step forward, or to `Failed`
    /// from any non-terminal state.
    pub fn can_advance_to(self, to: CertificateState) -> bool {
        if to == CertificateState::Failed {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }
}

impl fmt::Display for CertificateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CertificateState::Unsigned => "unsigned",
            CertificateState::Committed => "committed",
            CertificateState::DraftBuilt => "draft-built",
            CertificateState::Signed => "signed",
            CertificateState::Verified => "verified",
            CertificateState::Broadcast => "broadcast",
            CertificateState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::CertificateState::*;

    #[test]
    fn test_happy_path_is_linear() {
        let mut state = Unsigned;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            assert!(state.can_advance_to(next));
            state = next;
            seen.push(state);
        }
        assert_eq!(seen, vec![Unsigned, Committed, DraftBuilt, Signed, Verified, Broadcast]);
    }

    #[test]
    fn test_out_of_order_rejected() {
        assert!(!Unsigned.can_advance_to(Signed));
        assert!(!Signed.can_advance_to(DraftBuilt));
        assert!(!Committed.can_advance_to(Committed));
        assert!(!Broadcast.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Unsigned));
        assert!(DraftBuilt.can_advance_to(Failed));
    }
}
