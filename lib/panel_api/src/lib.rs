mod client;
pub use client::{Client, WriteRequest};

mod error;
pub use error::Error;

mod state;
pub use state::{format_address, Device, Reading, SystemState};

pub type Result<T> = std::result::Result<T, Error>;
