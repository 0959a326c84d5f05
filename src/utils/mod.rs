pub mod geo;
pub mod jwt;

pub use geo::{distance_meters, within_radius, GeoPoint};
pub use jwt::{decode_jwt, encode_token};
