//! Flow direction resolution.
//!
//! Turns a decoded direction plus an unsigned magnitude into what gets
//! published, according to the channel's `PowerSign` mode. The mode is read
//! at flush time, so a changed option applies from the next completed cycle.

use crate::config::PowerSign;

/// Decoded flow direction of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    /// Forward flow, sign +1.
    Consuming,
    /// Reverse flow, sign -1.
    Producing,
    /// Raw code outside the known encoding.
    Unknown(i64),
}

impl FlowDirection {
    /// Arithmetic sign, if known.
    pub fn sign(self) -> Option<f64> {
        match self {
            FlowDirection::Consuming => Some(1.0),
            FlowDirection::Producing => Some(-1.0),
            FlowDirection::Unknown(_) => None,
        }
    }

    /// Categorical label for unsigned publication.
    pub fn label(self) -> FlowLabel {
        match self {
            FlowDirection::Consuming => FlowLabel::Consuming,
            FlowDirection::Producing => FlowLabel::Producing,
            FlowDirection::Unknown(_) => FlowLabel::Unknown,
        }
    }

    /// Label published for this direction under `mode`.
    pub fn label_for(self, mode: PowerSign) -> FlowLabel {
        match (self, mode) {
            (FlowDirection::Unknown(_), _) => FlowLabel::Unknown,
            (_, PowerSign::Signed) => FlowLabel::Sign,
            (d, PowerSign::Unsigned) => d.label(),
        }
    }
}

/// Published direction label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowLabel {
    Consuming,
    Producing,
    /// Direction is carried by the sign of the power value.
    Sign,
    Unknown,
}

impl FlowLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowLabel::Consuming => "consuming",
            FlowLabel::Producing => "producing",
            FlowLabel::Sign => "sign",
            FlowLabel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FlowLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power as published plus the signed value used for the combined total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPower {
    pub power: f64,
    pub label: FlowLabel,
    /// `None` when the direction is unknown.
    pub signed: Option<f64>,
}

/// Resolve a direction and unsigned magnitude under `mode`.
///
/// An unknown direction publishes the bare magnitude with the `unknown`
/// label in either mode.
pub fn resolve(direction: FlowDirection, magnitude: f64, mode: PowerSign) -> ResolvedPower {
    let signed = direction.sign().map(|s| magnitude * s);
    let power = match (mode, signed) {
        (PowerSign::Signed, Some(v)) => v,
        _ => magnitude,
    };
    ResolvedPower {
        power,
        label: direction.label_for(mode),
        signed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectionCalibration;

    #[test]
    fn forward_unsigned_keeps_magnitude_and_labels_consuming() {
        let dir = DirectionCalibration::default().decode(0);
        let r = resolve(dir, 150.0 / 10.0, PowerSign::Unsigned);
        assert_eq!(r.power, 15.0);
        assert_eq!(r.label.as_str(), "consuming");
        assert_eq!(r.signed, Some(15.0));
    }

    #[test]
    fn forward_signed_labels_sign() {
        let dir = DirectionCalibration::default().decode(0);
        let r = resolve(dir, 15.0, PowerSign::Signed);
        assert_eq!(r.power, 15.0);
        assert_eq!(r.label.as_str(), "sign");
    }

    #[test]
    fn reverse_signed_negates() {
        let dir = DirectionCalibration::default().decode(1);
        let r = resolve(dir, 15.0, PowerSign::Signed);
        assert_eq!(r.power, -15.0);
        assert_eq!(r.label, FlowLabel::Sign);
        assert_eq!(r.signed, Some(-15.0));
    }

    #[test]
    fn reverse_unsigned_reports_producing_but_signed_value_is_negative() {
        let r = resolve(FlowDirection::Producing, 42.0, PowerSign::Unsigned);
        assert_eq!(r.power, 42.0);
        assert_eq!(r.label, FlowLabel::Producing);
        assert_eq!(r.signed, Some(-42.0));
    }

    #[test]
    fn unknown_direction_publishes_magnitude_without_sign() {
        for mode in [PowerSign::Unsigned, PowerSign::Signed] {
            let r = resolve(FlowDirection::Unknown(3), 9.5, mode);
            assert_eq!(r.power, 9.5);
            assert_eq!(r.label, FlowLabel::Unknown);
            assert_eq!(r.signed, None);
        }
    }
}
