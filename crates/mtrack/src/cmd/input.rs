use mtrack_packet::{Entries, InputModeSpec};
use serde::Serialize;

use crate::cmd::{channel_set, open_client, InputArgs, LinkArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct InputOutput {
    channel_list: Vec<usize>,
    #[serde(flatten)]
    spec: InputModeSpec,
}

pub fn run(args: InputArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let spec = InputModeSpec {
        channels: channel_set(args.channels.as_deref())?,
        mode: args.mode.into(),
        polarity: args.polarity.into(),
        edge: args.edge.into(),
        value: args.value,
        spacing: args.spacing,
    };

    let mut client = open_client(link)?;
    client
        .set_input_mode(&Entries::from(spec))
        .into_result()
        .map_err(|err| client_error("input mode update failed", err))?;

    let out = InputOutput {
        channel_list: spec.channels.iter().collect(),
        spec,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "channels {:?}: {:?} on {:?} edge ({:?}), value={} spacing={}",
                out.channel_list, spec.mode, spec.edge, spec.polarity, spec.value, spec.spacing
            );
        }
    }
    Ok(SUCCESS)
}
