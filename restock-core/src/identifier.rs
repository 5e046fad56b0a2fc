//! Composite store identifiers.
//!
//! Layout: `<installation code><continuity code><sequence:03>`, e.g. `11007`.
//! The sequence is the position of the survey response being processed, so
//! reprocessing the same survey sheet yields the same identifiers.

use crate::error::IdentifierError;
use crate::types::{ContinuityFeasibility, InstallationFrequency, StoreId};

/// Largest sequence number the 3-digit field can hold.
pub const MAX_COUNTER: u32 = 999;

/// Build the identifier for one survey response.
///
/// Pure: the same three inputs always produce the same identifier. Counters
/// outside `1..=MAX_COUNTER` are rejected rather than truncated.
pub fn generate_identifier(
    installation: InstallationFrequency,
    continuity: ContinuityFeasibility,
    counter: u32,
) -> Result<StoreId, IdentifierError> {
    if counter == 0 || counter > MAX_COUNTER {
        return Err(IdentifierError::CounterOutOfRange { counter });
    }
    Ok(StoreId(format!(
        "{}{}{:03}",
        installation.code(),
        continuity.code(),
        counter
    )))
}

/// Running counter advanced once per survey response, whether the response is
/// written, skipped as a duplicate, or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSequence {
    next: u32,
}

impl IdentifierSequence {
    pub fn starting_at(start: u32) -> Self {
        Self { next: start }
    }

    /// Return the counter for the current response and move past it.
    pub fn advance(&mut self) -> u32 {
        let current = self.next;
        self.next = self.next.saturating_add(1);
        current
    }

    pub fn peek(&self) -> u32 {
        self.next
    }
}

impl Default for IdentifierSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn first_time_self_install_counter_seven() {
        let first: InstallationFrequency = "初めて".parse().unwrap();
        let selfish: ContinuityFeasibility = "自分が設置にいけば".parse().unwrap();
        let id = generate_identifier(first, selfish, 7).unwrap();
        assert_eq!(id, StoreId::from("11007"));
    }

    #[rstest]
    #[case(InstallationFrequency::First, ContinuityFeasibility::SelfInstall, 1, "11001")]
    #[case(InstallationFrequency::Multiple, ContinuityFeasibility::OtherMember, 42, "22042")]
    #[case(InstallationFrequency::Other, ContinuityFeasibility::Other, 999, "33999")]
    #[case(InstallationFrequency::First, ContinuityFeasibility::Other, 100, "13100")]
    fn identifier_layout(
        #[case] installation: InstallationFrequency,
        #[case] continuity: ContinuityFeasibility,
        #[case] counter: u32,
        #[case] expected: &str,
    ) {
        let id = generate_identifier(installation, continuity, counter).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[test]
    fn every_valid_triple_is_five_chars_and_deterministic() {
        let installs = [
            InstallationFrequency::First,
            InstallationFrequency::Multiple,
            InstallationFrequency::Other,
        ];
        let conts = [
            ContinuityFeasibility::SelfInstall,
            ContinuityFeasibility::OtherMember,
            ContinuityFeasibility::Other,
        ];
        for i in installs {
            for c in conts {
                for counter in [1, 9, 10, 99, 100, 500, 999] {
                    let a = generate_identifier(i, c, counter).unwrap();
                    let b = generate_identifier(i, c, counter).unwrap();
                    assert_eq!(a, b);
                    let s = a.as_str();
                    assert_eq!(s.len(), 5, "{s}");
                    let bytes = s.as_bytes();
                    assert!((b'1'..=b'3').contains(&bytes[0]), "{s}");
                    assert!((b'1'..=b'3').contains(&bytes[1]), "{s}");
                    assert!(bytes[2..].iter().all(u8::is_ascii_digit), "{s}");
                }
            }
        }
    }

    #[rstest]
    #[case(0)]
    #[case(1000)]
    #[case(12345)]
    fn out_of_range_counter_fails_loudly(#[case] counter: u32) {
        let err = generate_identifier(
            InstallationFrequency::First,
            ContinuityFeasibility::SelfInstall,
            counter,
        )
        .unwrap_err();
        assert_eq!(err, IdentifierError::CounterOutOfRange { counter });
    }

    #[test]
    fn sequence_advances_by_one() {
        let mut seq = IdentifierSequence::default();
        assert_eq!(seq.advance(), 1);
        assert_eq!(seq.advance(), 2);
        assert_eq!(seq.peek(), 3);
    }
}
