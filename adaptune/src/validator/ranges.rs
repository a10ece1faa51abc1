//! Recommended parameter ranges per device category.

use crate::device::DeviceCategory;
use crate::optimizer::{ParameterRange, TunableParameter};

/// Range the validator sweeps for `param` on a `category` device.
#[rustfmt::skip]
pub fn category_range(category: DeviceCategory, param: TunableParameter) -> ParameterRange {
    use DeviceCategory::*;
    use TunableParameter::*;

    let (min, max, step) = match (category, param) {
        (UltraHighEnd, ThrottleInterval) => (8.0, 20.0, 2.0),
        (UltraHighEnd, DebounceDelay)    => (25.0, 150.0, 25.0),
        (UltraHighEnd, TouchThreshold)   => (5.0, 10.0, 1.0),
        (UltraHighEnd, TouchDelay)       => (50.0, 200.0, 50.0),
        (UltraHighEnd, MaxAnimations)    => (6.0, 10.0, 1.0),

        (HighEnd, ThrottleInterval)      => (12.0, 28.0, 2.0),
        (HighEnd, DebounceDelay)         => (50.0, 200.0, 25.0),
        (HighEnd, TouchThreshold)        => (6.0, 12.0, 1.0),
        (HighEnd, TouchDelay)            => (100.0, 300.0, 50.0),
        (HighEnd, MaxAnimations)         => (4.0, 8.0, 1.0),

        (MidRange, ThrottleInterval)     => (16.0, 36.0, 4.0),
        (MidRange, DebounceDelay)        => (75.0, 225.0, 25.0),
        (MidRange, TouchThreshold)       => (8.0, 12.0, 1.0),
        (MidRange, TouchDelay)           => (150.0, 350.0, 50.0),
        (MidRange, MaxAnimations)        => (3.0, 6.0, 1.0),

        (LowEnd, ThrottleInterval)       => (24.0, 44.0, 4.0),
        (LowEnd, DebounceDelay)          => (100.0, 275.0, 25.0),
        (LowEnd, TouchThreshold)         => (10.0, 14.0, 1.0),
        (LowEnd, TouchDelay)             => (200.0, 450.0, 50.0),
        (LowEnd, MaxAnimations)          => (2.0, 4.0, 1.0),

        (Legacy, ThrottleInterval)       => (32.0, 50.0, 6.0),
        (Legacy, DebounceDelay)          => (150.0, 300.0, 50.0),
        (Legacy, TouchThreshold)         => (12.0, 15.0, 1.0),
        (Legacy, TouchDelay)             => (300.0, 500.0, 50.0),
        (Legacy, MaxAnimations)          => (1.0, 3.0, 1.0),
    };
    ParameterRange::new(min, max, step)
}
