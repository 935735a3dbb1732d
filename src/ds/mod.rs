pub mod pin_ring;

pub use pin_ring::{PinRing, PinTarget, RingGuard};
