pub mod city;
pub mod models;

pub use city::{CityName, CityNameError};
pub use models::Reading;
