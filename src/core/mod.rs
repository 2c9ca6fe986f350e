//! ACBS Core Components
//!
//! Transport, time and cookie primitives shared by the authentication and
//! bundle layers.

pub mod clock;
pub mod session_cookie;
pub mod transport;

pub use clock::*;
pub use session_cookie::*;
pub use transport::*;
