pub mod app;
pub mod dispatch;
pub mod poller;
pub mod ui;
pub mod view;

pub type ErasedError = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, ErasedError>;
