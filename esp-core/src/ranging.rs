//! LIDAR-Logik (VL53L0X)
//!
//! Klassifizierung der Rohwerte, Mittelwertbildung über ein Zeitfenster
//! und die Register-Arithmetik des Sensors: Signal-Rate, VCSEL-Perioden,
//! Sequenz-Timeouts, Timing-Budget und Referenz-SPAD-Auswahl.
//! Der I2C-Treiber in esp-firmware liest und schreibt nur die Register.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::traits::SensorError;

/// Rohwerte ab dieser Grenze bedeuten "kein Ziel in Reichweite"
pub const OUT_OF_RANGE_MM: u16 = 8190;

/// Länge des Mittelungs-Fensters in Millisekunden
pub const AVERAGE_WINDOW_MS: u64 = 1000;

/// Einzelne Messung nach Klassifizierung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeReading {
    Valid(u16),
    OutOfRange,
    Timeout,
}

/// Klassifiziert einen Rohwert des Sensors
pub fn classify(raw_mm: u16, timed_out: bool) -> RangeReading {
    if timed_out {
        RangeReading::Timeout
    } else if raw_mm >= OUT_OF_RANGE_MM {
        RangeReading::OutOfRange
    } else {
        RangeReading::Valid(raw_mm)
    }
}

impl RangeReading {
    /// Ordnet das Ergebnis eines Sensor-Zugriffs ein
    ///
    /// Jeder Fehler (Timeout, Bus) zählt als verpasste Messung.
    pub fn from_measurement(result: Result<u16, SensorError>) -> Self {
        match result {
            Ok(raw_mm) => classify(raw_mm, false),
            Err(_) => RangeReading::Timeout,
        }
    }
}

/// Mittelwert eines Fensters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RangeSample {
    pub avg_mm: u16,
    /// Anzahl gültiger Messungen im Fenster
    pub readings: u16,
    /// Ende des Fensters (ms seit Boot)
    pub timestamp_ms: u64,
}

impl RangeSample {
    pub fn avg_cm(&self) -> f32 {
        self.avg_mm as f32 / 10.0
    }
}

/// Sammelt gültige Messungen und liefert einmal pro Fenster den Mittelwert
#[derive(Debug, Clone)]
pub struct RangeAverager {
    window_ms: u64,
    window_start_ms: u64,
    sum: u32,
    count: u16,
    last_avg: Option<u16>,
}

impl RangeAverager {
    pub fn new(now_ms: u64) -> Self {
        Self::with_window(now_ms, AVERAGE_WINDOW_MS)
    }

    pub fn with_window(now_ms: u64, window_ms: u64) -> Self {
        Self {
            window_ms,
            window_start_ms: now_ms,
            sum: 0,
            count: 0,
            last_avg: None,
        }
    }

    /// Zuletzt berechneter Mittelwert (für Statusanzeige)
    pub fn last_average(&self) -> Option<u16> {
        self.last_avg
    }

    /// Nimmt eine Messung auf
    ///
    /// Gibt am Fensterende einen [`RangeSample`] zurück, sofern im Fenster
    /// mindestens eine gültige Messung lag. Das Fenster wird danach immer
    /// zurückgesetzt.
    pub fn record(&mut self, reading: RangeReading, now_ms: u64) -> Option<RangeSample> {
        if let RangeReading::Valid(mm) = reading {
            self.sum += mm as u32;
            self.count = self.count.saturating_add(1);
        }

        if now_ms.saturating_sub(self.window_start_ms) < self.window_ms {
            return None;
        }

        let sample = (self.count > 0).then(|| {
            let avg_mm = (self.sum / self.count as u32) as u16;
            RangeSample {
                avg_mm,
                readings: self.count,
                timestamp_ms: now_ms,
            }
        });
        if let Some(sample) = sample {
            self.last_avg = Some(sample.avg_mm);
        }

        self.sum = 0;
        self.count = 0;
        self.window_start_ms = now_ms;
        sample
    }
}

/// Kodiert ein Signal-Rate-Limit (MCPS) als Q9.7 Fixed-Point
///
/// Gültig sind 0.0 bis 511.99 MCPS.
pub fn encode_signal_rate_limit(mcps: f32) -> Option<u16> {
    if !(0.0..=511.99).contains(&mcps) {
        return None;
    }
    Some((mcps * (1 << 7) as f32) as u16)
}

/// Kodiert eine VCSEL-Pulsperiode (in PCLKs) für das Register
///
/// Nur gerade Perioden sind erlaubt, Kodierung: (p >> 1) - 1.
pub fn encode_vcsel_period(period_pclks: u8) -> Option<u8> {
    if period_pclks < 4 || period_pclks % 2 != 0 {
        return None;
    }
    Some((period_pclks >> 1) - 1)
}

/// Dekodiert das VCSEL-Perioden-Register in PCLKs
pub fn decode_vcsel_period(register: u8) -> u8 {
    register.saturating_add(1) << 1
}

/// Gültige Phasen-Obergrenze (PRE_RANGE_CONFIG_VALID_PHASE_HIGH)
///
/// Der Pre-Range-Schritt erlaubt nur 12, 14, 16 oder 18 PCLKs.
pub fn pre_range_valid_phase_high(period_pclks: u8) -> Option<u8> {
    match period_pclks {
        12 => Some(0x18),
        14 => Some(0x30),
        16 => Some(0x40),
        18 => Some(0x50),
        _ => None,
    }
}

/// Register-Werte, die sich mit der Final-Range VCSEL-Periode ändern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalRangePhase {
    pub valid_phase_high: u8,
    pub vcsel_width: u8,
    pub phasecal_timeout: u8,
    pub phasecal_limit: u8,
}

/// Phasen-Einstellungen für 8, 10, 12 oder 14 PCLKs
pub fn final_range_phase(period_pclks: u8) -> Option<FinalRangePhase> {
    let (valid_phase_high, vcsel_width, phasecal_timeout, phasecal_limit) = match period_pclks {
        8 => (0x10, 0x02, 0x0C, 0x30),
        10 => (0x28, 0x03, 0x09, 0x20),
        12 => (0x38, 0x03, 0x08, 0x20),
        14 => (0x48, 0x03, 0x07, 0x20),
        _ => return None,
    };
    Some(FinalRangePhase {
        valid_phase_high,
        vcsel_width,
        phasecal_timeout,
        phasecal_limit,
    })
}

// ============================================================================
// Sequenz-Timeouts und Timing-Budget
// ============================================================================

/// Kleinstes erlaubtes Timing-Budget in µs
pub const MIN_TIMING_BUDGET_US: u32 = 20_000;

// Overheads pro Sequenz-Schritt in µs. Beim Setzen rechnet der Sensor mit
// einem kleineren Start-Overhead als beim Auslesen.
const START_OVERHEAD_GET_US: u32 = 1910;
const START_OVERHEAD_SET_US: u32 = 1320;
const END_OVERHEAD_US: u32 = 960;
const MSRC_OVERHEAD_US: u32 = 660;
const TCC_OVERHEAD_US: u32 = 590;
const DSS_OVERHEAD_US: u32 = 690;
const PRE_RANGE_OVERHEAD_US: u32 = 660;
const FINAL_RANGE_OVERHEAD_US: u32 = 550;

/// Makro-Periode in ns für eine VCSEL-Periode
pub fn macro_period_ns(vcsel_pclks: u8) -> u32 {
    (2304 * vcsel_pclks as u32 * 1655 + 500) / 1000
}

pub fn timeout_mclks_to_us(mclks: u32, vcsel_pclks: u8) -> u32 {
    let period = macro_period_ns(vcsel_pclks) as u64;
    ((mclks as u64 * period + 500) / 1000) as u32
}

pub fn timeout_us_to_mclks(us: u32, vcsel_pclks: u8) -> u32 {
    let period = (macro_period_ns(vcsel_pclks) as u64).max(1);
    ((us as u64 * 1000 + period / 2) / period) as u32
}

/// Timeout-Register: `LSB * 2^MSB + 1` MCLKs
pub fn decode_timeout(register: u16) -> u32 {
    let mantissa = (register & 0x00FF) as u32;
    let exponent = (register >> 8) as u32;
    mantissa
        .checked_shl(exponent)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

pub fn encode_timeout(mclks: u32) -> u16 {
    if mclks == 0 {
        return 0;
    }
    let mut mantissa = mclks - 1;
    let mut exponent = 0u16;
    while mantissa & 0xFFFF_FF00 != 0 {
        mantissa >>= 1;
        exponent += 1;
    }
    (exponent << 8) | (mantissa & 0xFF) as u16
}

/// MSRC_CONFIG_TIMEOUT_MACROP hält `mclks - 1`, maximal 255
pub fn msrc_timeout_register(mclks: u32) -> u8 {
    if mclks > 256 {
        255
    } else {
        mclks.saturating_sub(1) as u8
    }
}

/// Aktive Schritte der Mess-Sequenz (SYSTEM_SEQUENCE_CONFIG)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSteps {
    pub tcc: bool,
    pub msrc: bool,
    pub dss: bool,
    pub pre_range: bool,
    pub final_range: bool,
}

impl SequenceSteps {
    pub fn from_register(config: u8) -> Self {
        Self {
            tcc: config & 0x10 != 0,
            dss: config & 0x08 != 0,
            msrc: config & 0x04 != 0,
            pre_range: config & 0x40 != 0,
            final_range: config & 0x80 != 0,
        }
    }
}

/// Rohwerte der Timeout- und Perioden-Register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutRegisters {
    pub pre_range_vcsel_period: u8,
    pub final_range_vcsel_period: u8,
    pub msrc_timeout: u8,
    pub pre_range_timeout: u16,
    pub final_range_timeout: u16,
}

/// Dekodierte Timeouts der Sequenz-Schritte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTimeouts {
    pub pre_range_vcsel_pclks: u8,
    pub final_range_vcsel_pclks: u8,
    pub msrc_dss_tcc_mclks: u32,
    pub pre_range_mclks: u32,
    /// Ohne den Pre-Range-Anteil
    pub final_range_mclks: u32,
    pub msrc_dss_tcc_us: u32,
    pub pre_range_us: u32,
    pub final_range_us: u32,
}

impl SequenceTimeouts {
    pub fn from_registers(steps: SequenceSteps, registers: &TimeoutRegisters) -> Self {
        let pre_range_vcsel_pclks = decode_vcsel_period(registers.pre_range_vcsel_period);
        let final_range_vcsel_pclks = decode_vcsel_period(registers.final_range_vcsel_period);

        let msrc_dss_tcc_mclks = registers.msrc_timeout as u32 + 1;
        let pre_range_mclks = decode_timeout(registers.pre_range_timeout);
        let mut final_range_mclks = decode_timeout(registers.final_range_timeout);
        // Das Final-Range-Register enthält den Pre-Range-Timeout mit
        if steps.pre_range {
            final_range_mclks = final_range_mclks.saturating_sub(pre_range_mclks);
        }

        Self {
            pre_range_vcsel_pclks,
            final_range_vcsel_pclks,
            msrc_dss_tcc_mclks,
            pre_range_mclks,
            final_range_mclks,
            msrc_dss_tcc_us: timeout_mclks_to_us(msrc_dss_tcc_mclks, pre_range_vcsel_pclks),
            pre_range_us: timeout_mclks_to_us(pre_range_mclks, pre_range_vcsel_pclks),
            final_range_us: timeout_mclks_to_us(final_range_mclks, final_range_vcsel_pclks),
        }
    }
}

fn sequence_overhead_us(start_us: u32, steps: SequenceSteps, timeouts: &SequenceTimeouts) -> u32 {
    let mut budget = start_us + END_OVERHEAD_US;
    if steps.tcc {
        budget += timeouts.msrc_dss_tcc_us + TCC_OVERHEAD_US;
    }
    if steps.dss {
        budget += 2 * (timeouts.msrc_dss_tcc_us + DSS_OVERHEAD_US);
    } else if steps.msrc {
        budget += timeouts.msrc_dss_tcc_us + MSRC_OVERHEAD_US;
    }
    if steps.pre_range {
        budget += timeouts.pre_range_us + PRE_RANGE_OVERHEAD_US;
    }
    budget
}

/// Aktuelles Timing-Budget einer Messung in µs
pub fn measurement_timing_budget_us(steps: SequenceSteps, timeouts: &SequenceTimeouts) -> u32 {
    let mut budget = sequence_overhead_us(START_OVERHEAD_GET_US, steps, timeouts);
    if steps.final_range {
        budget += timeouts.final_range_us + FINAL_RANGE_OVERHEAD_US;
    }
    budget
}

/// Final-Range-Timeout-Register für ein gewünschtes Timing-Budget
///
/// `None` wenn das Budget unter dem Minimum liegt, nicht für die übrigen
/// Schritte reicht oder der Final-Range-Schritt deaktiviert ist.
pub fn final_range_timeout_for_budget(
    budget_us: u32,
    steps: SequenceSteps,
    timeouts: &SequenceTimeouts,
) -> Option<u16> {
    if budget_us < MIN_TIMING_BUDGET_US || !steps.final_range {
        return None;
    }
    let used_us = sequence_overhead_us(START_OVERHEAD_SET_US, steps, timeouts)
        + FINAL_RANGE_OVERHEAD_US;
    let final_range_us = budget_us.checked_sub(used_us)?;

    let mut mclks = timeout_us_to_mclks(final_range_us, timeouts.final_range_vcsel_pclks);
    if steps.pre_range {
        mclks += timeouts.pre_range_mclks;
    }
    Some(encode_timeout(mclks))
}

// ============================================================================
// Referenz-SPADs
// ============================================================================

/// Anzahl Referenz-SPADs in GLOBAL_CONFIG_SPAD_ENABLES_REF
pub const REF_SPAD_COUNT: usize = 48;

/// Wählt `count` Referenz-SPADs aus der Werks-Map aus
///
/// Aperture-SPADs beginnen bei Index 12, davor wird alles abgeschaltet.
/// Nach `count` aktiven SPADs werden die restlichen deaktiviert.
pub fn select_reference_spads(mut map: [u8; 6], count: u8, aperture: bool) -> [u8; 6] {
    let first = if aperture { 12 } else { 0 };
    let mut enabled = 0u8;
    for i in 0..REF_SPAD_COUNT {
        let (byte, bit) = (i / 8, 1u8 << (i % 8));
        if i < first || enabled == count {
            map[byte] &= !bit;
        } else if map[byte] & bit != 0 {
            enabled += 1;
        }
    }
    map
}
