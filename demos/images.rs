//! Report the geometry of every captured stereo frame.
//!
//! Usage: cargo run --example images
//! Press Enter to stop.

use duo3d::{find_optimal_binning, CaptureConfig, Device, DuoError, DuoLibrary, ResolutionFilter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WIDTH: i32 = 320;
const HEIGHT: i32 = 240;
const FPS: f32 = 30.0;

fn main() {
    env_logger::init();

    let lib = match DuoLibrary::global() {
        Ok(lib) => lib,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    println!("DUOLib Version:       v{}", lib.version().unwrap_or_default());

    let filter = ResolutionFilter::size(WIDTH, HEIGHT)
        .with_binning(find_optimal_binning(WIDTH, HEIGHT))
        .with_fps(FPS);
    let Some(&ri) = lib.enumerate_resolutions(&filter, 1).first() else {
        eprintln!("No matching resolution");
        std::process::exit(1);
    };

    let mut device = Device::new(lib);
    if !matches!(device.open(), Ok(true)) {
        eprintln!("Could not open DUO camera");
        std::process::exit(1);
    }

    println!("DUO Device Name:      '{}'", device.device_name().ok().flatten().unwrap_or_default());
    println!("DUO Serial Number:    {}", device.serial_number().ok().flatten().unwrap_or_default());

    let _ = device.set_resolution_info(ri);

    let stream = match device.start_capture(&CaptureConfig::from_env()) {
        Ok(Some(s)) => s,
        Ok(None) => {
            eprintln!("Could not start DUO camera");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let done = Arc::new(AtomicBool::new(false));
    let done_flag = done.clone();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        done_flag.store(true, Ordering::Relaxed);
    });

    let mut frame_num: u64 = 0;
    while !done.load(Ordering::Relaxed) {
        match stream.recv_timeout(Duration::from_millis(500)) {
            Ok(frame) => {
                println!("DUO Frame #{}\n", frame_num);
                println!("  Timestamp:          {:10.1} ms", frame.timestamp_ms());
                println!("  Frame Size:         {}x{}", frame.width, frame.height);
                println!("  Left Frame Buffer:  {} bytes", frame.left.len());
                println!("  Right Frame Buffer: {} bytes", frame.right.len());
                println!("{}", "-".repeat(50));
                frame_num += 1;
            }
            Err(DuoError::Timeout) => continue,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    println!("{:?}", stream.stats());
    let _ = device.stop_capture();
    let _ = device.close();
}
