#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use slam2d_lie as lie;

#[doc(inline)]
pub use slam2d_scan as scan;

#[doc(inline)]
pub use slam2d_icp as icp;
