use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("mtrack {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: mtrack");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("MTRACK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("protocol: {}", mtrack_packet::PROTOCOL_VERSION);
    println!("channels: {}", mtrack_packet::CHANNELS);
    println!(
        "hardware_link: {}",
        if cfg!(target_os = "linux") {
            "spidev"
        } else {
            "unavailable"
        }
    );

    Ok(SUCCESS)
}
