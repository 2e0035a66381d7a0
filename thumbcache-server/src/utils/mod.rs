mod headers;
mod port;
mod size;

// Export utility functions
pub use self::headers::parse_headers;
pub use self::port::parse_port;
pub use self::size::format_bytes;
pub use self::size::parse_size;
