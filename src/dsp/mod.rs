//! # DSP (Digital Signal Processing) Primitives
//!
//! The building blocks the delay processor wires together:
//!
//! - **`delay_line`**: a ring buffer read back with Hermite interpolation,
//!   so delay times can glide smoothly through fractional samples.
//! - **`filter`**: a state-variable filter used as the low cut (highpass)
//!   and high cut (lowpass) in the feedback path.
//! - **`saturator`**: the `tanh` waveshaper between the two filters.
//! - **`smoother`**: linear and one-pole parameter smoothers plus the
//!   equal-power pan law.
//! - **`crossfade`**: the click-free bypass switch.

pub mod crossfade;
pub mod delay_line;
pub mod filter;
pub mod saturator;
pub mod smoother;
