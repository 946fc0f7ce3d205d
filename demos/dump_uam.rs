use std::borrow::BorrowMut;

use time::format_description::FormatItem;
use time::macros::format_description;

use camx_uam::readers::{ReaderOptions, UamReader};
use camx_uam::ByteOrder;

/// 時間の開始日時を出力する書式
const HOUR_DATETIME_FMT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: dump_uam <file> [--little-endian]"))?;
    let byte_order = match args.next().as_deref() {
        Some("--little-endian") => ByteOrder::LittleEndian,
        _ => ByteOrder::BigEndian,
    };

    let options = ReaderOptions::default().with_byte_order(byte_order);
    let mut reader = UamReader::open_with(&path, options)?;
    reader.pretty_print(std::io::stdout().borrow_mut())?;

    let species_names = reader.header().species_names.clone();
    for frame in reader.hours() {
        let frame = frame?;
        let begin = frame.bounds.begin_date_time()?;
        print!("{}", begin.format(HOUR_DATETIME_FMT)?);
        for name in &species_names {
            let first = frame.values.get(name).and_then(|v| v.first()).copied();
            match first {
                Some(value) => print!(" {name}={value}"),
                None => print!(" {name}=-"),
            }
        }
        println!();
    }
    reader.close();

    Ok(())
}
