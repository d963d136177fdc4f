// DHT11 Temperatur- und Feuchtigkeitssensor (1-Wire, Bit-Banging)
//
// Der Pin muss Open-Drain mit Pull-Up konfiguriert sein:
// set_low() zieht die Leitung runter, set_high() gibt sie frei.

use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use esp_core::climate::{FRAME_BITS, bits_from_pulses, decode_frame};
use esp_core::{ClimateReading, ClimateSensor, SensorError};

/// Dauer des Start-Signals (Host zieht die Leitung auf Low)
const START_LOW_MS: u32 = 18;

/// Maximale Dauer eines einzelnen Pegels in µs
const LEVEL_TIMEOUT_US: u64 = 100;

pub struct Dht11<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Dht11<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(mut pin: P, delay: D) -> Self {
        // Leitung im Ruhezustand freigeben
        let _ = pin.set_high();
        Self { pin, delay }
    }

    /// Liest einen kompletten 40-Bit Frame
    pub fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        self.pin.set_low().map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(START_LOW_MS);
        self.pin.set_high().map_err(|_| SensorError::Bus)?;

        // Ab hier zählt jede Mikrosekunde, WiFi-Interrupts würden die
        // Pulsmessung verfälschen
        let pulses = critical_section::with(|_| self.receive_pulses())?;
        Ok(bits_from_pulses(&pulses))
    }

    fn receive_pulses(&mut self) -> Result<[u32; FRAME_BITS], SensorError> {
        // Antwort des Sensors: 80 µs Low, 80 µs High
        self.wait_while(true)?;
        self.wait_while(false)?;
        self.wait_while(true)?;

        let mut pulses = [0u32; FRAME_BITS];
        for pulse in pulses.iter_mut() {
            // 50 µs Low, danach High: 26-28 µs = 0, 70 µs = 1
            self.wait_while(false)?;
            *pulse = self.wait_while(true)?;
        }
        Ok(pulses)
    }

    /// Wartet solange der Pegel `high` anliegt, gibt die Dauer in µs zurück
    fn wait_while(&mut self, high: bool) -> Result<u32, SensorError> {
        let start = Instant::now();
        loop {
            let level = self.pin.is_high().map_err(|_| SensorError::Bus)?;
            let elapsed = start.elapsed().as_micros();
            if level != high {
                return Ok(elapsed as u32);
            }
            if elapsed > LEVEL_TIMEOUT_US {
                return Err(SensorError::Timeout);
            }
        }
    }
}

impl<P, D> ClimateSensor for Dht11<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        decode_frame(self.read_frame()?)
    }
}
