// VL53L0X Time-of-Flight Sensor (I2C)
//
// Register-Treiber mit kompletter Initialisierung: Data-Init, SPAD-Setup,
// Tuning-Tabelle, Referenz-Kalibrierung, Long-Range-Perioden und
// Timing-Budget. Gemessen wird im Continuous-Modus.
// Die Arithmetik (Timeouts, Budget, SPAD-Auswahl) liegt in esp-core::ranging.

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::i2c::I2c;
use esp_core::ranging::{
    MIN_TIMING_BUDGET_US, SequenceSteps, SequenceTimeouts, TimeoutRegisters,
    encode_signal_rate_limit, encode_timeout, encode_vcsel_period, final_range_phase,
    final_range_timeout_for_budget, measurement_timing_budget_us, msrc_timeout_register,
    pre_range_valid_phase_high, select_reference_spads, timeout_us_to_mclks,
};
use esp_core::{RangeSensor, SensorError};

// Register-Adressen (aus der ST API)
const SYSRANGE_START: u8 = 0x00;
const SYSTEM_SEQUENCE_CONFIG: u8 = 0x01;
const SYSTEM_INTERRUPT_CONFIG_GPIO: u8 = 0x0A;
const SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
const RESULT_INTERRUPT_STATUS: u8 = 0x13;
const RESULT_RANGE_STATUS: u8 = 0x14;
const FINAL_RANGE_MIN_COUNT_RATE_RTN_LIMIT: u8 = 0x44;
const MSRC_CONFIG_TIMEOUT_MACROP: u8 = 0x46;
const FINAL_RANGE_VALID_PHASE_LOW: u8 = 0x47;
const FINAL_RANGE_VALID_PHASE_HIGH: u8 = 0x48;
const PRE_RANGE_VCSEL_PERIOD: u8 = 0x50;
const PRE_RANGE_TIMEOUT_MACROP_HI: u8 = 0x51;
const PRE_RANGE_VALID_PHASE_LOW: u8 = 0x56;
const PRE_RANGE_VALID_PHASE_HIGH: u8 = 0x57;
const MSRC_CONFIG_CONTROL: u8 = 0x60;
const FINAL_RANGE_VCSEL_PERIOD: u8 = 0x70;
const FINAL_RANGE_TIMEOUT_MACROP_HI: u8 = 0x71;
const GLOBAL_CONFIG_VCSEL_WIDTH: u8 = 0x32;
const ALGO_PHASECAL_CONFIG_TIMEOUT: u8 = 0x30;
const ALGO_PHASECAL_LIM: u8 = 0x30;
const GPIO_HV_MUX_ACTIVE_HIGH: u8 = 0x84;
const I2C_MODE: u8 = 0x88;
const PAD_I2C_HV_CONFIG: u8 = 0x89;
const GLOBAL_CONFIG_SPAD_ENABLES_REF_0: u8 = 0xB0;
const GLOBAL_CONFIG_REF_EN_START_SELECT: u8 = 0xB6;
const DYNAMIC_SPAD_NUM_REQUESTED_REF_SPAD: u8 = 0x4E;
const DYNAMIC_SPAD_REF_EN_START_OFFSET: u8 = 0x4F;
const IDENTIFICATION_MODEL_ID: u8 = 0xC0;

/// Erwarteter Wert von IDENTIFICATION_MODEL_ID
const MODEL_ID: u8 = 0xEE;

/// Signal-Rate-Limit nach dem Data-Init (MCPS)
const DEFAULT_SIGNAL_RATE_LIMIT_MCPS: f32 = 0.25;

/// Sequenz-Schritte im Betrieb: DSS, Pre-Range, Final-Range
const DEFAULT_SEQUENCE: u8 = 0xE8;

/// Abstand zwischen zwei Status-Abfragen
const POLL_STEP: Duration = Duration::from_millis(5);

/// Default-Tuning-Einstellungen der ST API (Register, Wert)
#[rustfmt::skip]
const TUNING_SETTINGS: &[(u8, u8)] = &[
    (0xFF, 0x01), (0x00, 0x00),
    (0xFF, 0x00), (0x09, 0x00), (0x10, 0x00), (0x11, 0x00),
    (0x24, 0x01), (0x25, 0xFF), (0x75, 0x00),
    (0xFF, 0x01), (0x4E, 0x2C), (0x48, 0x00), (0x30, 0x20),
    (0xFF, 0x00), (0x30, 0x09), (0x54, 0x00), (0x31, 0x04),
    (0x32, 0x03), (0x40, 0x83), (0x46, 0x25), (0x60, 0x00),
    (0x27, 0x00), (0x50, 0x06), (0x51, 0x00), (0x52, 0x96),
    (0x56, 0x08), (0x57, 0x30), (0x61, 0x00), (0x62, 0x00),
    (0x64, 0x00), (0x65, 0x00), (0x66, 0xA0),
    (0xFF, 0x01), (0x22, 0x32), (0x47, 0x14), (0x49, 0xFF), (0x4A, 0x00),
    (0xFF, 0x00), (0x7A, 0x0A), (0x7B, 0x00), (0x78, 0x21),
    (0xFF, 0x01), (0x23, 0x34), (0x42, 0x00), (0x44, 0xFF),
    (0x45, 0x26), (0x46, 0x05), (0x40, 0x40), (0x0E, 0x06),
    (0x20, 0x1A), (0x43, 0x40),
    (0xFF, 0x00), (0x34, 0x03), (0x35, 0x44),
    (0xFF, 0x01), (0x31, 0x04), (0x4B, 0x09), (0x4C, 0x05), (0x4D, 0x04),
    (0xFF, 0x00), (0x44, 0x00), (0x45, 0x20), (0x47, 0x08),
    (0x48, 0x28), (0x67, 0x00), (0x70, 0x04), (0x71, 0x01),
    (0x72, 0xFE), (0x76, 0x00), (0x77, 0x00),
    (0xFF, 0x01), (0x0D, 0x01),
    (0xFF, 0x00), (0x80, 0x01), (0x01, 0xF8),
    (0xFF, 0x01), (0x8E, 0x01), (0x00, 0x01), (0xFF, 0x00), (0x80, 0x00),
];

/// Long-Range Parameter
#[derive(Debug, Clone, Copy)]
pub struct LongRange {
    pub signal_rate_limit_mcps: f32,
    pub pre_range_pclks: u8,
    pub final_range_pclks: u8,
    pub timing_budget_us: u32,
}

#[derive(Debug, Clone, Copy)]
enum VcselStep {
    PreRange,
    FinalRange,
}

pub struct Vl53l0x<I> {
    i2c: I,
    address: u8,
    stop_variable: u8,
    timing_budget_us: u32,
    timeout: Duration,
}

impl<I: I2c> Vl53l0x<I> {
    pub fn new(i2c: I, address: u8, timeout: Duration) -> Self {
        Self {
            i2c,
            address,
            stop_variable: 0,
            timing_budget_us: 0,
            timeout,
        }
    }

    /// Initialisiert den Sensor und startet kontinuierliche Messungen
    pub async fn init(&mut self, long_range: LongRange) -> Result<(), SensorError> {
        // Konfiguration vor dem ersten Bus-Zugriff prüfen
        let rate = encode_signal_rate_limit(long_range.signal_rate_limit_mcps)
            .ok_or(SensorError::InvalidConfig)?;
        if pre_range_valid_phase_high(long_range.pre_range_pclks).is_none()
            || final_range_phase(long_range.final_range_pclks).is_none()
            || long_range.timing_budget_us < MIN_TIMING_BUDGET_US
        {
            return Err(SensorError::InvalidConfig);
        }

        self.data_init()?;
        self.static_init().await?;
        self.reference_calibration().await?;

        self.write_u16(FINAL_RANGE_MIN_COUNT_RATE_RTN_LIMIT, rate)?;
        self.set_vcsel_period(VcselStep::PreRange, long_range.pre_range_pclks)
            .await?;
        self.set_vcsel_period(VcselStep::FinalRange, long_range.final_range_pclks)
            .await?;
        self.set_measurement_timing_budget(long_range.timing_budget_us)?;

        self.start_continuous()
    }

    /// Timing-Budget wie zuletzt gesetzt, in µs
    pub fn timing_budget_us(&self) -> u32 {
        self.timing_budget_us
    }

    fn data_init(&mut self) -> Result<(), SensorError> {
        if self.read_u8(IDENTIFICATION_MODEL_ID)? != MODEL_ID {
            return Err(SensorError::NotDetected);
        }

        // 2V8 I/O Modus und I2C Standard-Modus
        let pad = self.read_u8(PAD_I2C_HV_CONFIG)?;
        self.write_u8(PAD_I2C_HV_CONFIG, pad | 0x01)?;
        self.write_u8(I2C_MODE, 0x00)?;

        self.enter_private_page()?;
        self.stop_variable = self.read_u8(0x91)?;
        self.leave_private_page()?;

        // SIGNAL_RATE_MSRC und SIGNAL_RATE_PRE_RANGE Limit-Checks aus
        let msrc = self.read_u8(MSRC_CONFIG_CONTROL)?;
        self.write_u8(MSRC_CONFIG_CONTROL, msrc | 0x12)?;

        let rate = encode_signal_rate_limit(DEFAULT_SIGNAL_RATE_LIMIT_MCPS)
            .ok_or(SensorError::InvalidConfig)?;
        self.write_u16(FINAL_RANGE_MIN_COUNT_RATE_RTN_LIMIT, rate)?;
        self.write_u8(SYSTEM_SEQUENCE_CONFIG, 0xFF)
    }

    async fn static_init(&mut self) -> Result<(), SensorError> {
        let (spad_count, aperture) = self.spad_info().await?;

        let mut spad_map = [0u8; 6];
        self.read_multi(GLOBAL_CONFIG_SPAD_ENABLES_REF_0, &mut spad_map)?;

        self.write_u8(0xFF, 0x01)?;
        self.write_u8(DYNAMIC_SPAD_REF_EN_START_OFFSET, 0x00)?;
        self.write_u8(DYNAMIC_SPAD_NUM_REQUESTED_REF_SPAD, 0x2C)?;
        self.write_u8(0xFF, 0x00)?;
        self.write_u8(GLOBAL_CONFIG_REF_EN_START_SELECT, 0xB4)?;

        let spad_map = select_reference_spads(spad_map, spad_count, aperture);
        self.write_multi(GLOBAL_CONFIG_SPAD_ENABLES_REF_0, &spad_map)?;

        for &(register, value) in TUNING_SETTINGS {
            self.write_u8(register, value)?;
        }

        // Interrupt "new sample ready", active low
        self.write_u8(SYSTEM_INTERRUPT_CONFIG_GPIO, 0x04)?;
        let mux = self.read_u8(GPIO_HV_MUX_ACTIVE_HIGH)?;
        self.write_u8(GPIO_HV_MUX_ACTIVE_HIGH, mux & !0x10)?;
        self.write_u8(SYSTEM_INTERRUPT_CLEAR, 0x01)?;

        // Budget neu setzen, nachdem die Sequenz umgestellt wurde
        let budget = self.measurement_timing_budget()?;
        self.write_u8(SYSTEM_SEQUENCE_CONFIG, DEFAULT_SEQUENCE)?;
        self.set_measurement_timing_budget(budget)
    }

    /// Anzahl Referenz-SPADs und ob es Aperture-SPADs sind
    async fn spad_info(&mut self) -> Result<(u8, bool), SensorError> {
        self.write_u8(0x80, 0x01)?;
        self.write_u8(0xFF, 0x01)?;
        self.write_u8(0x00, 0x00)?;
        self.write_u8(0xFF, 0x06)?;
        let flags = self.read_u8(0x83)?;
        self.write_u8(0x83, flags | 0x04)?;
        self.write_u8(0xFF, 0x07)?;
        self.write_u8(0x81, 0x01)?;
        self.write_u8(0x80, 0x01)?;
        self.write_u8(0x94, 0x6B)?;
        self.write_u8(0x83, 0x00)?;

        let start = Instant::now();
        while self.read_u8(0x83)? == 0x00 {
            if start.elapsed() > self.timeout {
                return Err(SensorError::Timeout);
            }
            Timer::after(POLL_STEP).await;
        }

        self.write_u8(0x83, 0x01)?;
        let info = self.read_u8(0x92)?;

        self.write_u8(0x81, 0x00)?;
        self.write_u8(0xFF, 0x06)?;
        let flags = self.read_u8(0x83)?;
        self.write_u8(0x83, flags & !0x04)?;
        self.write_u8(0xFF, 0x01)?;
        self.write_u8(0x00, 0x01)?;
        self.write_u8(0xFF, 0x00)?;
        self.write_u8(0x80, 0x00)?;

        Ok((info & 0x7F, info & 0x80 != 0))
    }

    /// VHV- und Phasen-Kalibrierung
    async fn reference_calibration(&mut self) -> Result<(), SensorError> {
        self.write_u8(SYSTEM_SEQUENCE_CONFIG, 0x01)?;
        self.single_ref_calibration(0x40).await?;
        self.write_u8(SYSTEM_SEQUENCE_CONFIG, 0x02)?;
        self.single_ref_calibration(0x00).await?;
        self.write_u8(SYSTEM_SEQUENCE_CONFIG, DEFAULT_SEQUENCE)
    }

    async fn single_ref_calibration(&mut self, vhv_init: u8) -> Result<(), SensorError> {
        self.write_u8(SYSRANGE_START, 0x01 | vhv_init)?;
        self.wait_for_interrupt().await?;
        self.write_u8(SYSTEM_INTERRUPT_CLEAR, 0x01)?;
        self.write_u8(SYSRANGE_START, 0x00)
    }

    /// Setzt die VCSEL-Pulsperiode eines Schritts samt abhängiger Timeouts
    async fn set_vcsel_period(&mut self, step: VcselStep, pclks: u8) -> Result<(), SensorError> {
        let register = encode_vcsel_period(pclks).ok_or(SensorError::InvalidConfig)?;
        let steps = self.sequence_steps()?;
        let timeouts = self.sequence_timeouts(steps)?;

        match step {
            VcselStep::PreRange => {
                let phase_high =
                    pre_range_valid_phase_high(pclks).ok_or(SensorError::InvalidConfig)?;
                self.write_u8(PRE_RANGE_VALID_PHASE_HIGH, phase_high)?;
                self.write_u8(PRE_RANGE_VALID_PHASE_LOW, 0x08)?;
                self.write_u8(PRE_RANGE_VCSEL_PERIOD, register)?;

                let pre_range_mclks = timeout_us_to_mclks(timeouts.pre_range_us, pclks);
                self.write_u16(PRE_RANGE_TIMEOUT_MACROP_HI, encode_timeout(pre_range_mclks))?;

                let msrc_mclks = timeout_us_to_mclks(timeouts.msrc_dss_tcc_us, pclks);
                self.write_u8(MSRC_CONFIG_TIMEOUT_MACROP, msrc_timeout_register(msrc_mclks))?;
            }
            VcselStep::FinalRange => {
                let phase = final_range_phase(pclks).ok_or(SensorError::InvalidConfig)?;
                self.write_u8(FINAL_RANGE_VALID_PHASE_HIGH, phase.valid_phase_high)?;
                self.write_u8(FINAL_RANGE_VALID_PHASE_LOW, 0x08)?;
                self.write_u8(GLOBAL_CONFIG_VCSEL_WIDTH, phase.vcsel_width)?;
                self.write_u8(ALGO_PHASECAL_CONFIG_TIMEOUT, phase.phasecal_timeout)?;
                self.write_u8(0xFF, 0x01)?;
                self.write_u8(ALGO_PHASECAL_LIM, phase.phasecal_limit)?;
                self.write_u8(0xFF, 0x00)?;
                self.write_u8(FINAL_RANGE_VCSEL_PERIOD, register)?;

                let mut final_range_mclks = timeout_us_to_mclks(timeouts.final_range_us, pclks);
                if steps.pre_range {
                    final_range_mclks += timeouts.pre_range_mclks;
                }
                self.write_u16(FINAL_RANGE_TIMEOUT_MACROP_HI, encode_timeout(final_range_mclks))?;
            }
        }

        // Budget mit den neuen Perioden neu verteilen, danach Phase nachkalibrieren
        self.set_measurement_timing_budget(self.timing_budget_us)?;
        let sequence = self.read_u8(SYSTEM_SEQUENCE_CONFIG)?;
        self.write_u8(SYSTEM_SEQUENCE_CONFIG, 0x02)?;
        self.single_ref_calibration(0x00).await?;
        self.write_u8(SYSTEM_SEQUENCE_CONFIG, sequence)
    }

    fn measurement_timing_budget(&mut self) -> Result<u32, SensorError> {
        let steps = self.sequence_steps()?;
        let timeouts = self.sequence_timeouts(steps)?;
        let budget = measurement_timing_budget_us(steps, &timeouts);
        self.timing_budget_us = budget;
        Ok(budget)
    }

    fn set_measurement_timing_budget(&mut self, budget_us: u32) -> Result<(), SensorError> {
        let steps = self.sequence_steps()?;
        let timeouts = self.sequence_timeouts(steps)?;
        let register = final_range_timeout_for_budget(budget_us, steps, &timeouts)
            .ok_or(SensorError::InvalidConfig)?;
        self.write_u16(FINAL_RANGE_TIMEOUT_MACROP_HI, register)?;
        self.timing_budget_us = budget_us;
        Ok(())
    }

    fn sequence_steps(&mut self) -> Result<SequenceSteps, SensorError> {
        Ok(SequenceSteps::from_register(
            self.read_u8(SYSTEM_SEQUENCE_CONFIG)?,
        ))
    }

    fn sequence_timeouts(&mut self, steps: SequenceSteps) -> Result<SequenceTimeouts, SensorError> {
        let registers = TimeoutRegisters {
            pre_range_vcsel_period: self.read_u8(PRE_RANGE_VCSEL_PERIOD)?,
            final_range_vcsel_period: self.read_u8(FINAL_RANGE_VCSEL_PERIOD)?,
            msrc_timeout: self.read_u8(MSRC_CONFIG_TIMEOUT_MACROP)?,
            pre_range_timeout: self.read_u16(PRE_RANGE_TIMEOUT_MACROP_HI)?,
            final_range_timeout: self.read_u16(FINAL_RANGE_TIMEOUT_MACROP_HI)?,
        };
        Ok(SequenceTimeouts::from_registers(steps, &registers))
    }

    /// Back-to-back Modus: nächste Messung startet sofort nach der letzten
    fn start_continuous(&mut self) -> Result<(), SensorError> {
        self.enter_private_page()?;
        self.write_u8(0x91, self.stop_variable)?;
        self.leave_private_page()?;
        self.write_u8(SYSRANGE_START, 0x02)
    }

    /// Wartet auf "new sample ready" und gibt dem Executor zwischen den Abfragen frei
    async fn wait_for_interrupt(&mut self) -> Result<(), SensorError> {
        let start = Instant::now();
        while self.read_u8(RESULT_INTERRUPT_STATUS)? & 0x07 == 0 {
            if start.elapsed() > self.timeout {
                return Err(SensorError::Timeout);
            }
            Timer::after(POLL_STEP).await;
        }
        Ok(())
    }

    fn enter_private_page(&mut self) -> Result<(), SensorError> {
        self.write_u8(0x80, 0x01)?;
        self.write_u8(0xFF, 0x01)?;
        self.write_u8(0x00, 0x00)
    }

    fn leave_private_page(&mut self) -> Result<(), SensorError> {
        self.write_u8(0x00, 0x01)?;
        self.write_u8(0xFF, 0x00)?;
        self.write_u8(0x80, 0x00)
    }

    fn read_u8(&mut self, register: u8) -> Result<u8, SensorError> {
        let mut buffer = [0u8; 1];
        self.read_multi(register, &mut buffer)?;
        Ok(buffer[0])
    }

    fn read_u16(&mut self, register: u8) -> Result<u16, SensorError> {
        let mut buffer = [0u8; 2];
        self.read_multi(register, &mut buffer)?;
        Ok(u16::from_be_bytes(buffer))
    }

    fn read_multi(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[register], buffer)
            .map_err(|_| SensorError::Bus)
    }

    fn write_u8(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.write_multi(register, &[value])
    }

    fn write_u16(&mut self, register: u8, value: u16) -> Result<(), SensorError> {
        self.write_multi(register, &value.to_be_bytes())
    }

    fn write_multi(&mut self, register: u8, data: &[u8]) -> Result<(), SensorError> {
        // Register-Adresse + maximal 6 Bytes (SPAD-Map)
        let mut frame = [0u8; 7];
        let len = data.len().min(frame.len() - 1);
        frame[0] = register;
        frame[1..=len].copy_from_slice(&data[..len]);
        self.i2c
            .write(self.address, &frame[..=len])
            .map_err(|_| SensorError::Bus)
    }
}

impl<I: I2c> RangeSensor for Vl53l0x<I> {
    async fn read_mm(&mut self) -> Result<u16, SensorError> {
        self.wait_for_interrupt().await?;

        // Distanz steht 10 Bytes hinter RESULT_RANGE_STATUS
        let range = self.read_u16(RESULT_RANGE_STATUS + 10)?;
        self.write_u8(SYSTEM_INTERRUPT_CLEAR, 0x01)?;
        Ok(range)
    }
}
