pub mod catalog;
pub mod config;
pub mod decode;
pub mod display;
pub mod error;
pub mod filter;
pub mod orientation;
pub mod selector;
pub mod session;
pub mod platform {
    pub mod keep_awake;
}
pub mod tasks {
    pub mod clock;
    pub mod preload;
}

pub use error::Error;
