//! Adjust the LED brightness of a running DUO without a frame callback.
//!
//! Usage: cargo run --example parameters
//! Type `+` or `-` and Enter to change the brightness, `q` to quit.

use duo3d::{find_optimal_binning, Device, DuoLibrary, ResolutionFilter};
use std::io::BufRead;

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
    println!("DUO Firmware Version: v{}", device.firmware_version().ok().flatten().unwrap_or_default());
    println!("DUO Firmware Build:   {}", device.firmware_build().ok().flatten().unwrap_or_default());

    let _ = device.set_resolution_info(ri);

    let mut led_pwm: u8 = 30;
    let _ = device.set_led_pwm(f64::from(led_pwm));

    if !matches!(device.start_without_callback(true), Ok(true)) {
        eprintln!("Could not start DUO camera");
        let _ = device.close();
        std::process::exit(1);
    }

    println!("Use '+' to increase the brightness of the LEDs");
    println!("Use '-' to decrease the brightness of the LEDs");
    println!("Use 'q' to exit the program\n");

    'input: for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        for ch in line.chars() {
            match ch {
                '+' => led_pwm = (led_pwm + 1).min(100),
                '-' => led_pwm = led_pwm.saturating_sub(1),
                'q' => break 'input,
                _ => continue,
            }
            println!("LED: {:3}%", led_pwm);
            if !matches!(device.set_led_pwm(f64::from(led_pwm)), Ok(true)) {
                eprintln!("SetDUOLedPWM({}) failed", led_pwm);
            }
        }
    }

    let _ = device.stop_capture();
    let _ = device.close();
}
