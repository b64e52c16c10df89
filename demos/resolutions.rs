//! List the capture modes DUOLib offers, optionally filtered by size.
//!
//! Usage: cargo run --example resolutions [WIDTH HEIGHT]

use duo3d::{find_optimal_binning, DuoLibrary, ResolutionFilter};

fn main() {
    env_logger::init();

    let args: Vec<i32> = std::env::args()
        .skip(1)
        .filter_map(|a| a.parse().ok())
        .collect();
    let filter = match args.as_slice() {
        [w, h] => ResolutionFilter::size(*w, *h).with_binning(find_optimal_binning(*w, *h)),
        _ => ResolutionFilter::any(),
    };

    let lib = match DuoLibrary::global() {
        Ok(lib) => lib,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    println!("DUOLib {}", lib.version().unwrap_or_default());
    if let Some(path) = lib.path() {
        println!("Loaded from {}", path.display());
    }

    let modes = lib.enumerate_resolutions(&filter, 64);
    if modes.is_empty() {
        println!("No matching resolutions");
        return;
    }
    for ri in modes {
        println!(
            "{:4}x{:<4} binning={:<28} fps={:6.2} [{:.2}, {:.2}]",
            ri.width,
            ri.height,
            format!("{:?}", ri.binning_flags()),
            ri.fps,
            ri.min_fps,
            ri.max_fps
        );
    }
}
