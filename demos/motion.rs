//! Print the IMU samples carried by every frame of a DUO MLX.
//!
//! Usage: cargo run --example motion
//! Press Enter to start capturing, Enter again to stop.

use duo3d::{AccelRange, Binning, CaptureConfig, Device, DuoLibrary, GyroRange, ResolutionFilter};

fn wait_for_enter() {
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}

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

    // 320x240 with 2x2 binning at 30 FPS
    let filter = ResolutionFilter::size(320, 240)
        .with_binning(Binning::HORIZONTAL2 | Binning::VERTICAL2)
        .with_fps(30.0);
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
    println!("DUO Firmware Version: v{}", device.firmware_version().ok().flatten().unwrap_or_default());
    println!("DUO Firmware Build:   {}", device.firmware_build().ok().flatten().unwrap_or_default());

    println!("Hit Enter to start capturing");
    wait_for_enter();

    let _ = device.set_resolution_info(ri);
    let _ = device.set_imu_range(AccelRange::G2, GyroRange::Dps250);

    let config = CaptureConfig {
        copy_pixels: false,
        ..CaptureConfig::from_env()
    };
    let started = device.start_capture_with(&config, |frame| {
        println!("DUO Frame Timestamp: {:10.1} ms", frame.timestamp_ms());
        for (i, s) in frame.imu.iter().enumerate() {
            println!(" Sample #{}", i + 1);
            println!("  Accelerometer: [{:8.5}, {:8.5}, {:8.5}]", s.accel[0], s.accel[1], s.accel[2]);
            println!("  Gyro: [{:8.5}, {:8.5}, {:8.5}]", s.gyro[0], s.gyro[1], s.gyro[2]);
            println!("  Temperature:   {:8.6} C", s.temperature);
        }
        println!("------------------------------------------------------");
    });

    match started {
        Ok(true) => {
            wait_for_enter();
            if let Some(stats) = device.capture_stats() {
                println!("{} frames, {} dropped", stats.delivered, stats.dropped);
            }
            let _ = device.stop_capture();
        }
        Ok(false) => eprintln!("Could not start DUO camera"),
        Err(e) => eprintln!("Error: {}", e),
    }

    let _ = device.close();
}
