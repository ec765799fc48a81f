use tracing::info;

use crate::cmd::{open_client, LinkArgs, ResetArgs};
use crate::exit::{transport_result, CliResult, SUCCESS};

pub fn run(_args: ResetArgs, link: &LinkArgs) -> CliResult<i32> {
    let mut client = open_client(link)?;
    let result = client.reset();
    if !result.is_ok() {
        return Err(transport_result("reset failed", result));
    }
    info!("device reset");
    Ok(SUCCESS)
}
