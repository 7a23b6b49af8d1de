// Adapters layer: concrete implementations of the domain ports.

pub mod clock;
pub mod http_parser;
pub mod influx;

pub use clock::SystemClock;
pub use http_parser::HttpZoneParser;
pub use influx::InfluxClient;
