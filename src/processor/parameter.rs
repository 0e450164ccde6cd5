// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// A ranged float parameter readable from any thread without locking.
pub struct FloatParameter {
    id: &'static str,
    min: f32,
    max: f32,
    default: f32,
    /// The current value's bits.
    value: AtomicU32,
}

impl FloatParameter {
    /// Creates a parameter. The default is clamped into range.
    pub fn new(id: &'static str, min: f32, max: f32, default: f32) -> FloatParameter {
        let default = default.clamp(min, max);
        FloatParameter {
            id,
            min,
            max,
            default,
            value: AtomicU32::new(default.to_bits()),
        }
    }

    /// The parameter's id, which is also its display name.
    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// The current value.
    pub fn value(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }

    /// Stores a value, clamped into range. Returns the stored value if it differs from the
    /// previous one, which is when listeners should hear about it. NaN is ignored.
    pub fn set_value(&self, value: f32) -> Option<f32> {
        if value.is_nan() {
            return None;
        }
        let value = value.clamp(self.min, self.max);
        let previous = self.value.swap(value.to_bits(), Ordering::AcqRel);
        if previous == value.to_bits() {
            None
        } else {
            Some(value)
        }
    }
}

impl fmt::Debug for FloatParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatParameter")
            .field("id", &self.id)
            .field("range", &(self.min, self.max))
            .field("value", &self.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_range() {
        let parameter = FloatParameter::new("Sound Choice", 0.0, 4.0, 0.0);
        assert_eq!("Sound Choice", parameter.id());
        assert_eq!(0.0, parameter.value());
        assert_eq!(0.0, parameter.default_value());
        assert_eq!((0.0, 4.0), parameter.range());

        let clamped = FloatParameter::new("clamped", 0.0, 4.0, 9.0);
        assert_eq!(4.0, clamped.value());
    }

    #[test]
    fn test_set_reports_changes_only() {
        let parameter = FloatParameter::new("Sound Choice", 0.0, 4.0, 0.0);

        assert_eq!(None, parameter.set_value(0.0));
        assert_eq!(Some(2.0), parameter.set_value(2.0));
        assert_eq!(None, parameter.set_value(2.0));
        assert_eq!(Some(2.5), parameter.set_value(2.5));
        assert_eq!(2.5, parameter.value());
    }

    #[test]
    fn test_set_clamps() {
        let parameter = FloatParameter::new("Sound Choice", 0.0, 4.0, 0.0);

        assert_eq!(Some(4.0), parameter.set_value(12.0));
        assert_eq!(None, parameter.set_value(5.0));
        assert_eq!(Some(0.0), parameter.set_value(-1.0));
        assert_eq!(None, parameter.set_value(f32::NAN));
        assert_eq!(0.0, parameter.value());
    }
}
