use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mtrack_client::{MotionSample, StreamSample};
use mtrack_packet::{DataMask, CHANNELS};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One JSON document per line.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn flag(on: bool) -> &'static str {
    if on {
        "yes"
    } else {
        "-"
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn print_masks(masks: &[DataMask; CHANNELS], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct MaskRow<'a> {
                channel: usize,
                byte: u8,
                #[serde(flatten)]
                mask: &'a DataMask,
            }
            let rows: Vec<MaskRow<'_>> = masks
                .iter()
                .enumerate()
                .map(|(channel, mask)| MaskRow {
                    channel,
                    byte: mask.to_byte(),
                    mask,
                })
                .collect();
            print_json(&rows);
        }
        OutputFormat::Table => {
            let mut t = table(vec![
                "CHANNEL", "ENABLED", "WIDTH", "RELATIVE", "VELOCITY", "STATUS",
            ]);
            for (channel, mask) in masks.iter().enumerate() {
                t.add_row(vec![
                    channel.to_string(),
                    flag(mask.enabled).to_string(),
                    format!("{} bit", mask.width.bits()),
                    flag(mask.relative).to_string(),
                    flag(mask.velocity).to_string(),
                    flag(mask.status).to_string(),
                ]);
            }
            println!("{t}");
        }
        OutputFormat::Pretty => {
            for (channel, mask) in masks.iter().enumerate() {
                if !mask.enabled {
                    println!("ch{channel}: disabled");
                    continue;
                }
                println!(
                    "ch{channel}: {}-bit {}{}{}",
                    mask.width.bits(),
                    if mask.relative { "relative" } else { "absolute" },
                    if mask.velocity { " +velocity" } else { "" },
                    if mask.status { " +status" } else { "" },
                );
            }
        }
    }
}

pub fn print_motion(samples: &[MotionSample], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(samples),
        OutputFormat::Table => {
            let mut t = table(vec![
                "CHANNEL",
                "POSITION",
                "MODE",
                "VELOCITY",
                "GLITCH",
                "OVERSPEED",
            ]);
            for s in samples {
                t.add_row(vec![
                    s.channel.to_string(),
                    s.position.to_string(),
                    if s.relative { "rel" } else { "abs" }.to_string(),
                    optional(s.velocity),
                    optional(s.status.map(|st| flag(st.glitch))),
                    optional(s.status.map(|st| flag(st.overspeed))),
                ]);
            }
            println!("{t}");
        }
        OutputFormat::Pretty => println!("{}", motion_line(samples)),
    }
}

fn motion_line(samples: &[MotionSample]) -> String {
    samples
        .iter()
        .map(|s| {
            let delta = if s.relative { "Δ" } else { "" };
            let mut field = format!("ch{}={delta}{}", s.channel, s.position);
            if let Some(v) = s.velocity {
                field.push_str(&format!(" v={v}"));
            }
            if let Some(st) = s.status {
                if st.glitch {
                    field.push_str(" GLITCH");
                }
                if st.overspeed {
                    field.push_str(" OVERSPEED");
                }
            }
            field
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Streams print one line per sample in every format.
pub fn print_stream_sample(seq: u64, sample: &StreamSample, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct StreamLine<'a> {
                seq: u64,
                #[serde(flatten)]
                sample: &'a StreamSample,
            }
            print_json(&StreamLine { seq, sample });
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut prefix = format!("#{seq}");
            if let Some(t) = sample.timestamp_us {
                prefix.push_str(&format!(" t={t}us"));
            }
            if let Some(n) = sample.elapsed_periods {
                prefix.push_str(&format!(" n={n}"));
            }
            println!("{prefix}  {}", motion_line(&sample.channels));
        }
    }
}
