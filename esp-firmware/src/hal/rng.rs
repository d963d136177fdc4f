// Hardware-Zufallszahlen für Exploration und TLS-Seeds

use esp_core::RandomSource;
use esp_hal::rng::Rng;

/// Hardware-RNG des ESP32-C6
///
/// Echte Entropie nur bei aktivem Radio (WiFi), sonst Pseudo-Zufall.
pub struct HardwareRng {
    rng: Rng,
}

impl HardwareRng {
    pub fn new() -> Self {
        Self { rng: Rng::new() }
    }

    /// 64-Bit Seed (embassy-net Stack, TLS)
    pub fn seed(&mut self) -> u64 {
        (self.rng.random() as u64) << 32 | self.rng.random() as u64
    }
}

impl Default for HardwareRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for HardwareRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.random()
    }
}
