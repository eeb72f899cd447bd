//! Sequence number tracking on the device's wrapping 16-bit counter.

/// Size of the device's sequence counter space. The counter is 16 bits wide
/// on the wire; arithmetic is done in `u32` and reduced by this modulus.
pub const SEQUENCE_MODULUS: u32 = 1 << 16;

/// Classification of an incoming sequence number relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceClass {
    /// First sequenced message seen for this device.
    Baseline,
    InOrder,
    /// Same number as the immediately preceding message.
    Duplicate,
    /// Neither duplicate nor the expected successor: dropped or reordered.
    Gap { expected: u16 },
}

#[derive(Debug, Clone)]
pub struct SequenceTracker {
    last: Option<u16>,
    increment: u16,
}

impl SequenceTracker {
    pub fn new(increment: u16) -> Self {
        Self {
            last: None,
            increment,
        }
    }

    pub fn last(&self) -> Option<u16> {
        self.last
    }

    pub fn increment(&self) -> u16 {
        self.increment
    }

    /// `(last + increment) mod 65536`, once a baseline exists.
    pub fn expected_next(&self) -> Option<u16> {
        self.last.map(|last| self.step(last))
    }

    /// Classify `seq` and make it the new reference, whatever the class.
    pub fn observe(&mut self, seq: u16) -> SequenceClass {
        let class = match self.last {
            None => SequenceClass::Baseline,
            Some(last) if seq == last => SequenceClass::Duplicate,
            Some(last) => {
                let expected = self.step(last);
                if seq == expected {
                    SequenceClass::InOrder
                } else {
                    SequenceClass::Gap { expected }
                }
            }
        };
        self.last = Some(seq);
        class
    }

    /// Account for one counter step carried by an unsequenced control message.
    /// Without a baseline there is nothing to advance.
    pub fn advance(&mut self) {
        if let Some(last) = self.last {
            self.last = Some(self.step(last));
        }
    }

    #[inline]
    fn step(&self, from: u16) -> u16 {
        ((u32::from(from) + u32::from(self.increment)) % SEQUENCE_MODULUS) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn first_message_is_baseline_not_gap() {
        let mut t = SequenceTracker::new(256);
        assert_eq!(t.observe(4_608), SequenceClass::Baseline);
        assert_eq!(t.last(), Some(4_608));
    }

    #[rstest]
    #[case(0, 256, SequenceClass::InOrder)]
    #[case(65_280, 0, SequenceClass::InOrder)]
    #[case(512, 512, SequenceClass::Duplicate)]
    #[case(512, 1_024, SequenceClass::Gap { expected: 768 })]
    #[case(512, 256, SequenceClass::Gap { expected: 768 })]
    fn classifies_relative_to_previous(
        #[case] prev: u16,
        #[case] next: u16,
        #[case] expected: SequenceClass,
    ) {
        let mut t = SequenceTracker::new(256);
        t.observe(prev);
        assert_eq!(t.observe(next), expected);
        assert_eq!(t.last(), Some(next));
    }

    #[test]
    fn gap_reference_is_last_observed_not_last_in_order() {
        let mut t = SequenceTracker::new(256);
        t.observe(0);
        assert!(matches!(t.observe(1_024), SequenceClass::Gap { .. }));
        assert_eq!(t.observe(1_280), SequenceClass::InOrder);
    }

    #[test]
    fn control_advance_moves_one_step() {
        let mut t = SequenceTracker::new(256);
        t.advance();
        assert_eq!(t.last(), None);
        t.observe(65_280);
        t.advance();
        assert_eq!(t.last(), Some(0));
        assert_eq!(t.observe(256), SequenceClass::InOrder);
    }
}
