extern crate pretty_env_logger;

pub mod polyline;
pub mod vehicle;

use chrono::Local;
use std::io::Write;

pub use log::{error, info, warn};
pub use polyline::{decode, decode_clean, GeoPoint};
pub use vehicle::{parse_fleet_message, FleetSnapshot, VehicleSnapshot, VehicleStatus};

pub const VERSION: (u32, u32) = (0, 1);
pub const VERSION_STR: &str = "0.1.0";

pub fn init_logging() {
    // pretty_env_logger doesn't appear to print anything without using
    // a filter in the builder.
    let filter = match std::env::var("RUST_LOG") {
        Ok(f) => f,
        Err(_e) => "info".to_owned(),
    };

    let _ = pretty_env_logger::formatted_builder()
        .parse_filters(&filter)
        .default_format()
        .format(|buf, record| {
            let level = { buf.default_styled_level(record.level()) };
            let mut module_path = match record.module_path() {
                Some(path) => path,
                None => "unknown",
            };

            // keeps the log clean (ex. fleetmap_client::channel -> fleetmap_client)
            let c_index = module_path.find(":");
            if c_index.is_some() {
                module_path = &module_path[..c_index.unwrap()];
            }

            writeln!(
                buf,
                "[{}] [{}] [{}]: {}",
                Local::now().format("%H:%M:%S%.3f"),
                module_path,
                format_args!("{:>5}", level),
                record.args()
            )
        })
        .try_init();
}
