#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use picalign_geometry as geometry;

#[doc(inline)]
pub use picalign_calib as calib;
