use clap::Parser;
use std::path::PathBuf;

use crate::utils::parse_port;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "HTTP thumbnail service with an on-disk image cache",
    long_about = "Serves resized JPEG thumbnails of remote images.\n\
                  \n\
                  GET /thumbnail?url=<source>&width=<w>&height=<h>\n\
                  \n\
                  Originals and every resized variant are cached on disk, so repeated\n\
                  requests for the same image and size are answered without downloading\n\
                  or resizing again."
)]
pub struct CliArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", help = "Address to listen on")]
    pub host: String,

    /// Port to bind, also accepts the ":8080" form
    #[arg(
        short,
        long,
        env = "PORT",
        default_value = "8080",
        value_parser = parse_port,
        help = "Port to listen on (also read from $PORT, \":8080\" is accepted)"
    )]
    pub port: u16,

    /// Cache directory
    #[arg(
        short,
        long,
        env = "THUMBCACHE_DIR",
        help = "Directory where originals and thumbnails are cached (default: <temp>/thumbcache)"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Memory tier size with optional unit (B, KB, MB, GB)
    #[arg(
        short = 'm',
        long,
        default_value = "32MB",
        help = "Size of the in-memory cache tier with optional unit (B, KB, MB, GB). Use 0 to disable."
    )]
    pub memory_cache_size: String,

    /// Overall fetch timeout in seconds
    #[arg(
        long,
        default_value = "30",
        help = "Overall timeout in seconds for fetching a source image (0 disables)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Maximum redirect hops
    #[arg(
        long,
        default_value = "10",
        help = "Maximum number of redirects followed when fetching a source image"
    )]
    pub max_redirects: usize,

    /// JPEG quality of generated thumbnails
    #[arg(
        long,
        default_value = "75",
        value_parser = clap::value_parser!(u8).range(1..=100),
        help = "JPEG quality (1-100) used for thumbnails"
    )]
    pub jpeg_quality: u8,

    /// Custom user agent
    #[arg(long, help = "User agent sent when fetching source images")]
    pub user_agent: Option<String>,

    /// Custom HTTP headers
    #[arg(
        short = 'H',
        long = "header",
        help = "Add custom HTTP header to source fetches (format: \"Name: Value\"). Can be used multiple times."
    )]
    pub headers: Vec<String>,

    /// Disable all proxy settings
    #[arg(long, help = "Ignore system proxy settings when fetching source images")]
    pub no_proxy: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose", help = "Only log errors")]
    pub quiet: bool,
}
