//! Binary readers for the Quake3-family bsp and md3 map formats, plus the
//! server-side bsp stripping transform.

pub mod bsp;
pub mod error;
pub mod md3;

pub use bsp::{BspData, BspInfo, strip_server_bsp};
pub use error::{Error, Result};
pub use md3::{Md3Data, Md3Info};
