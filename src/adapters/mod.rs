//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `log_sink`     | EventSink          | Serial log output        |
//! |                | TelemetrySink      |                          |
//! | `nvs`          | StoragePort        | NVS / in-memory store    |
//! | `sd_card`      | StoragePort        | FAT filesystem (SD card) |
//! | `time`         | ClockPort          | ESP32 system timer, RTC  |

pub mod log_sink;
pub mod nvs;
pub mod sd_card;
pub mod time;
