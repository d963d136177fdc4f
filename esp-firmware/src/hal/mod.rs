// Hardware Abstraction Layer (HAL) Module
//
// Treiber für die Sensoren und den Hardware-RNG. Sie implementieren die
// Traits aus esp-core, die Auswertung selbst ist dort auf dem Host testbar.

pub mod dht11;
pub mod rng;
pub mod vl53l0x;

pub use dht11::Dht11;
pub use rng::HardwareRng;
pub use vl53l0x::{LongRange, Vl53l0x};
