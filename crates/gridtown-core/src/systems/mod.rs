pub mod construction;
pub mod demand;
pub mod demographics;
pub mod disasters;
pub mod economy;
pub mod land_value;
pub mod power;
pub mod services;
pub mod tick;
pub mod water;
pub mod weather;
pub mod zones;

pub use construction::*;
pub use demand::*;
pub use demographics::*;
pub use disasters::*;
pub use economy::*;
pub use land_value::*;
pub use power::*;
pub use services::*;
pub use tick::*;
pub use water::*;
pub use weather::*;
pub use zones::*;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// RNG for a monthly roll. Mixing the month counter into the seed keeps
/// every month's rolls independent while equal seeds replay identically.
pub(crate) fn month_rng(seed: u64, month: u64, salt: u64) -> StdRng {
    StdRng::seed_from_u64(
        seed ^ salt ^ month.wrapping_mul(0x9E37_79B9_7F4A_7C15),
    )
}
