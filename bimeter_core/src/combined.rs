//! Combined A+B power, recomputed from what each channel last published.
//!
//! The device's own combined reading is never used: it cannot follow sign
//! corrections applied here after the fact.

use bimeter_traits::{FieldValue, Record};

use crate::fixed_point::sum_at_scale;
use crate::state::DeviceState;

/// Published name of the combined total.
pub const COMBINED_FIELD: &str = "power_ab";

/// Sum two signed channel powers on the `1/scale` grid.
#[inline]
pub fn combined_power(a: f64, b: f64, scale: i64) -> f64 {
    sum_at_scale(a, b, scale)
}

impl DeviceState {
    /// Combined total from both channels' last published signed powers.
    pub fn combined_power(&self) -> Option<f64> {
        let a = self.channel_a.last_emitted_signed_power()?;
        let b = self.channel_b.last_emitted_signed_power()?;
        Some(combined_power(a, b, self.power_scale))
    }

    /// Publish the combined total if both channels have published a signed power.
    pub(crate) fn recompute_combined(&self, record: &mut Record) -> Option<f64> {
        let total = self.combined_power()?;
        record.insert(COMBINED_FIELD, FieldValue::Number(total));
        Some(total)
    }
}
