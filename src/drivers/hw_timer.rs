//! Periodic control-cycle timer using ESP-IDF's esp_timer API.
//!
//! The timer callback only raises [`CONTROL_TICK`]; the control cycle
//! itself runs in the main task when the
//! [`TimerTrigger`](crate::scheduler::TimerTrigger) consumes the signal.
//! Ticks that arrive while a cycle is still running coalesce into one.
//!
//! On simulation targets no timer is started; tests raise the signal
//! directly.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Tick flag shared between the timer callback and the main loop.
pub type TickSignal = Signal<CriticalSectionRawMutex, ()>;

/// Raised once per control period.
pub static CONTROL_TICK: TickSignal = Signal::new();

#[cfg(target_os = "espidf")]
static mut CONTROL_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: CONTROL_TIMER is written once in `start_control_timer()` before
/// any timer callback fires.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn control_timer() -> esp_timer_handle_t {
    unsafe { CONTROL_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    CONTROL_TICK.signal(());
}

/// Start the periodic control timer.  Returns `false` if the timer could
/// not be created or started; the caller should fall back to polling.
#[cfg(target_os = "espidf")]
pub fn start_control_timer(period_ms: u32) -> bool {
    // SAFETY: CONTROL_TIMER is written here once at boot from the main
    // task before any callback fires.  The callback only touches the
    // critical-section guarded signal.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(control_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"control".as_ptr(),
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut CONTROL_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: control timer create failed (rc={})", ret);
            return false;
        }
        let ret = esp_timer_start_periodic(control_timer(), u64::from(period_ms) * 1000);
        if ret != ESP_OK {
            log::error!("hw_timer: control timer start failed (rc={})", ret);
            return false;
        }
    }
    info!("hw_timer: control tick every {} ms", period_ms);
    true
}

#[cfg(not(target_os = "espidf"))]
pub fn start_control_timer(period_ms: u32) -> bool {
    log::info!("hw_timer(sim): {} ms timer not started (raise CONTROL_TICK manually)", period_ms);
    true
}
