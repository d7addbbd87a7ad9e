use std::time::Duration;

use clap::{Parser, Subcommand};
use mjpeg::probe::{self, FramesStop, ProbeConfig};

#[derive(Parser)]
#[command(
    name = "mjpeg-probe",
    about = "Inspect MJPEG-over-HTTP endpoints"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print status, headers and the first body bytes of each URL
    Headers {
        /// URLs to fetch (defaults to the local screen.jpg and stream.mjpeg)
        urls: Vec<String>,
        #[arg(long, default_value_t = 3)]
        timeout_secs: u64,
        /// Body bytes to show
        #[arg(long, default_value_t = 100)]
        bytes: usize,
    },
    /// Quick connectivity check against a stream URL
    Check {
        #[arg(default_value = probe::DEFAULT_STREAM_URL)]
        url: String,
        #[arg(long, default_value_t = 2)]
        timeout_secs: u64,
        /// Body bytes to show
        #[arg(long, default_value_t = 200)]
        bytes: usize,
    },
    /// Read several frames from a multipart stream
    Frames {
        #[arg(default_value = probe::DEFAULT_STREAM_URL)]
        url: String,
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
        /// Number of frames to read
        #[arg(long, short, default_value_t = 5)]
        count: usize,
        /// Pause between frames
        #[arg(long, default_value_t = 100)]
        delay_ms: u64,
        /// Fail when the bytes after a payload are not CRLF
        #[arg(long)]
        strict: bool,
        /// Stop at parts without Content-Length instead of scanning for the boundary
        #[arg(long)]
        no_boundary_fallback: bool,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command {
        Command::Headers {
            urls,
            timeout_secs,
            bytes,
        } => {
            let urls = if urls.is_empty() {
                vec![
                    probe::DEFAULT_IMAGE_URL.to_string(),
                    probe::DEFAULT_STREAM_URL.to_string(),
                ]
            } else {
                urls
            };
            let config = ProbeConfig {
                timeout: Duration::from_secs(timeout_secs),
                preview_bytes: bytes,
                ..ProbeConfig::default()
            };
            for url in &urls {
                println!("\n--- {} ---", url);
                dump(url, &config);
            }
        }
        Command::Check {
            url,
            timeout_secs,
            bytes,
        } => {
            println!("Connecting to {}...", url);
            let config = ProbeConfig {
                timeout: Duration::from_secs(timeout_secs),
                preview_bytes: bytes,
                ..ProbeConfig::default()
            };
            dump(&url, &config);
        }
        Command::Frames {
            url,
            timeout_secs,
            count,
            delay_ms,
            strict,
            no_boundary_fallback,
        } => {
            let config = ProbeConfig {
                timeout: Duration::from_secs(timeout_secs),
                frames: count,
                frame_delay: (delay_ms > 0).then(|| Duration::from_millis(delay_ms)),
                strict_trailer: strict,
                boundary_fallback: !no_boundary_fallback,
                ..ProbeConfig::default()
            };
            frames(&url, &config);
        }
    }
}

fn dump(url: &str, config: &ProbeConfig) {
    match probe::dump(url, config) {
        Ok(report) => {
            print_head(&report.head);
            println!(
                "First {} bytes: {}",
                report.preview.len(),
                report.preview.escape_ascii()
            );
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn frames(url: &str, config: &ProbeConfig) {
    println!("\n--- Reading {} frames from {} ---", config.frames, url);

    let report = match probe::read_frames(url, config) {
        Ok(report) => report,
        Err(e) => {
            println!("\nError during stream test: {}", e);
            return;
        }
    };

    print_head(&report.head);

    for frame in &report.frames {
        println!("\n[Frame {}] {:?} framing", frame.index + 1, frame.framing);
        println!("Header: {}", frame.header_text);
        println!(
            "Read {} bytes{}",
            frame.payload_len,
            if frame.jpeg { " (JPEG)" } else { "" }
        );
        if !frame.trailer.is_empty() {
            println!(
                "Trailing bytes (expected \\r\\n): {}",
                frame.trailer.escape_ascii()
            );
        }
    }

    match &report.stop {
        FramesStop::Completed => println!("\nSuccessfully read all requested frames!"),
        FramesStop::EndOfStream => {
            println!("\nStream ended after {} frames", report.frames.len())
        }
        FramesStop::UnsupportedFraming(headers) => {
            println!("\nNo Content-Length and no boundary in part header: {}", headers)
        }
        FramesStop::Failed(e) => println!("\nError during stream test: {}", e),
    }
}

fn print_head(head: &mjpeg::ResponseHead) {
    println!("Status: {} {}", head.status_code, head.reason);
    println!("Headers:");
    for (name, value) in &head.headers.headers {
        println!("  {}: {}", name, value);
    }
}
