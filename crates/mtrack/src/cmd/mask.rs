use mtrack_packet::{DataMask, CHANNELS};

use crate::cmd::{open_client, DynClient, LinkArgs, MaskArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_masks, OutputFormat};

pub fn run(args: MaskArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = open_client(link)?;
    let masks = prepare_masks(&mut client, &args)?;
    print_masks(&masks, format);
    Ok(SUCCESS)
}

/// Adopt the device's masks, then apply the requested change on top.
pub fn prepare_masks(client: &mut DynClient, args: &MaskArgs) -> CliResult<[DataMask; CHANNELS]> {
    client
        .get_data_mask()
        .into_result()
        .map_err(|err| client_error("data mask query failed", err))?;

    if let Some(entries) = args.entries()? {
        client
            .set_data_mask(&entries)
            .into_result()
            .map_err(|err| client_error("data mask update failed", err))?;
    }
    Ok(client.state().masks)
}
