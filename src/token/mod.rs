/// Access/refresh token lifecycle

mod claims;
mod clock;
mod engine;

pub use claims::{Claims, TokenPair};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{TokenEngine, TokenSettings};
