//! The wire protocols this crate speaks. Sinks use these modules to render
//! the aggregate into their payloads.

pub mod influx;
