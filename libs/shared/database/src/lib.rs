pub mod rest;

pub use rest::{RestClient, RestResponse, REST_PREFIX};
