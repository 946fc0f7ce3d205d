//! CAMxなどの大気質モデルが使用するUAM形式のバイナリファイルを読み込む。
//!
//! UAM形式のファイルは、格子別の排出量または平均値を記録したファイルと、点源（煙突）別の
//! 排出量を記録したファイルに分けられる。いずれもヘッダーの後に1時間分のデータが
//! 順に記録されている。
//!
//! ```no_run
//! use camx_uam::readers::UamReader;
//!
//! let mut reader = UamReader::open("emissions.uam")?;
//! for frame in reader.hours() {
//!     let frame = frame?;
//!     println!("{} {}", frame.bounds.begin_date, frame.bounds.begin_time);
//! }
//! # Ok::<(), camx_uam::readers::UamReaderError>(())
//! ```
pub mod codec;
pub mod frame;
pub mod header;
pub mod index;
pub mod readers;

pub use codec::ByteOrder;
pub use frame::{Frame, HourBounds, PointHourRecord};
pub use header::{FileKind, GridDefinition, GridInfo, Header, Stack, StackTable};
pub use readers::{ReaderOptions, UamReader, UamReaderError, UamReaderResult};
