//! ADC1 oneshot sampling using raw ESP-IDF sys calls.
//!
//! [`init_adc1`] is called once from `main()`; afterwards each
//! [`Adc1Channel`] is an [`AdcSource`] for the thermistor driver.
//! There is no ADC on simulation targets: every read fails with
//! [`SensorError::AdcReadFailed`].

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::error::SensorError;
use crate::sensors::thermistor::AdcSource;

/// ESP32-S3 ADC1 channel wired to the thermistor divider (GPIO 9).
pub const THERMISTOR_CHANNEL: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcInitError(pub i32);

impl core::fmt::Display for AdcInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ADC1 init failed (rc={})", self.0)
    }
}

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: ADC1_HANDLE is written once by `init_adc1()` before any read;
/// all access happens from the main task.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

/// Create the ADC1 oneshot unit and configure `channels` for 12-bit,
/// 12 dB (0 – 3.1 V) conversion.
#[cfg(target_os = "espidf")]
pub fn init_adc1(channels: &[u32]) -> Result<(), AdcInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK {
        return Err(AdcInitError(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    for &channel in channels {
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
        if ret != ESP_OK {
            return Err(AdcInitError(ret));
        }
    }

    info!("adc: ADC1 configured ({} channels)", channels.len());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc1(channels: &[u32]) -> Result<(), AdcInitError> {
    log::info!("adc(sim): {} channels, no converter", channels.len());
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded main-loop access.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.clamp(0, i32::from(u16::MAX)) as u16)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Result<u16, SensorError> {
    Err(SensorError::AdcReadFailed)
}

/// One configured ADC1 channel.
#[derive(Debug, Clone, Copy)]
pub struct Adc1Channel(pub u32);

impl AdcSource for Adc1Channel {
    fn sample(&mut self) -> Result<u16, SensorError> {
        adc1_read(self.0)
    }
}
