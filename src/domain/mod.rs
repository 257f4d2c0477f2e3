pub mod prediction;
pub mod quality;
pub mod request;
pub mod weather;
