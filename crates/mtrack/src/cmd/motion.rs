use std::time::Duration;

use crate::cmd::mask::prepare_masks;
use crate::cmd::{open_client, LinkArgs, MotionArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_motion, OutputFormat};

pub fn run(args: MotionArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = open_client(link)?;
    prepare_masks(&mut client, &args.mask)?;

    for read in 0..args.count {
        if read > 0 {
            std::thread::sleep(Duration::from_millis(args.interval_ms));
        }
        let samples = client
            .get_motion_data()
            .into_result()
            .map_err(|err| client_error("motion read failed", err))?;
        print_motion(&samples, format);
    }
    Ok(SUCCESS)
}
