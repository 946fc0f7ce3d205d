use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::codec::{ByteOrder, Decoder};
use crate::frame::{read_frame, Frame};
use crate::header::{read_header, GridInfo, Header};

type FileReader = BufReader<File>;

/// 1ファイルに記録されている時間数の既定値
pub const HOURS_PER_FILE: i32 = 24;

/// `UamReader`の設定
///
/// ファイルを開くときに指定し、以後は変更できない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// ファイルに記録されている数値のバイト順
    pub byte_order: ByteOrder,

    /// 1ファイルに記録されている時間数
    ///
    /// 最後の時間の末尾ではパディングが省略されるため、その判定に使用する。
    pub hours_per_file: i32,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::BigEndian,
            hours_per_file: HOURS_PER_FILE,
        }
    }
}

impl ReaderOptions {
    /// バイト順を設定する。
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// 1ファイルに記録されている時間数を設定する。
    pub fn with_hours_per_file(mut self, hours_per_file: i32) -> Self {
        self.hours_per_file = hours_per_file;
        self
    }
}

/// `UamReader`
///
/// ヘッダーを読み込んだ後、1時間分のデータを順に読み込む。
/// 読み込み位置と現在の時間の番号を保持するため、複数のスレッドから同時に使用できない。
/// ファイルは`UamReader`が破棄されたときに閉じられる。
#[derive(Debug)]
pub struct UamReader<R = FileReader> {
    /// デコーダー
    decoder: Decoder<R>,
    /// ヘッダー
    header: Header,
    /// 設定
    options: ReaderOptions,
    /// 最後に読み込んだ時間の番号
    current_hour: i32,
    /// 読み込んだ時間数
    hours_read: usize,
}

impl UamReader<FileReader> {
    /// UAMファイルをビッグエンディアンとして開く。
    ///
    /// # 引数
    ///
    /// * `path` - 開くUAMファイルのパス
    ///
    /// # 戻り値
    ///
    /// `UamReader`
    pub fn open<P>(path: P) -> UamReaderResult<Self>
    where
        P: AsRef<Path>,
    {
        Self::open_with(path, ReaderOptions::default())
    }

    /// 設定を指定してUAMファイルを開く。
    ///
    /// # 引数
    ///
    /// * `path` - 開くUAMファイルのパス
    /// * `options` - 設定
    ///
    /// # 戻り値
    ///
    /// `UamReader`
    pub fn open_with<P>(path: P, options: ReaderOptions) -> UamReaderResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| UamReaderError::Open(format!("{}: {e}", path.display())))?;

        Self::from_reader(BufReader::new(file), options)
            .map_err(|e| e.within(&path.display().to_string()))
    }
}

impl<R> UamReader<R>
where
    R: Read,
{
    /// リーダーからヘッダーを読み込む。
    ///
    /// # 引数
    ///
    /// * `reader` - UAMファイルの先頭に位置するリーダー
    /// * `options` - 設定
    ///
    /// # 戻り値
    ///
    /// `UamReader`
    pub fn from_reader(reader: R, options: ReaderOptions) -> UamReaderResult<Self> {
        let mut decoder = Decoder::new(reader, options.byte_order);
        let header = read_header(&mut decoder, options.hours_per_file)?;
        log::debug!(
            "ヘッダーを読み込みました。種別: {:?}、格子数: {} x {} x {}、化学種: {}、点源: {}",
            header.kind,
            header.grid.nx,
            header.grid.ny,
            header.grid.nz,
            header.species_names.len(),
            header.point_count(),
        );

        Ok(Self {
            decoder,
            header,
            options,
            current_hour: 0,
            hours_read: 0,
        })
    }

    /// ヘッダーを返す。
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// 格子系の情報を返す。
    pub fn info(&self) -> GridInfo {
        self.header.info()
    }

    /// 設定を返す。
    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    /// 最後に読み込んだ時間の番号を返す。
    ///
    /// まだ時間別のデータを読み込んでいない場合は0を返す。
    pub fn current_hour_index(&self) -> i32 {
        self.current_hour
    }

    /// 読み込みに成功した時間数を返す。
    pub fn hours_read(&self) -> usize {
        self.hours_read
    }

    /// 次の1時間分のデータを読み込む。
    ///
    /// エラーが発生した場合、ファイルの読み込み位置は復元できないため、以後の読み込みは中止すること。
    /// `hours_per_file`回を超えて呼び出した場合の動作は未定義である。
    pub fn read_hour(&mut self) -> UamReaderResult<Frame> {
        let frame = read_frame(&mut self.decoder, &self.header, &mut self.current_hour)?;
        self.hours_read += 1;
        log::trace!(
            "{}番目の時間（開始時刻: {} {}）を読み込みました。",
            self.hours_read,
            frame.bounds.begin_date,
            frame.bounds.begin_time,
        );

        Ok(frame)
    }

    /// 次の1時間分のデータを読み込み、化学種ごとの値を`out`に格納する。
    ///
    /// `out`に格納済みの同じ化学種の値は上書きする。
    /// エラーが発生した場合、`out`は変更しない。
    pub fn read_next_hour(&mut self, out: &mut HashMap<String, Vec<f32>>) -> UamReaderResult<()> {
        let frame = self.read_hour()?;
        out.extend(frame.values);

        Ok(())
    }

    /// 残りの時間を順に読み込むイテレーターを返す。
    pub fn hours(&mut self) -> Hours<'_, R> {
        let remaining = usize::try_from(self.options.hours_per_file)
            .unwrap_or(0)
            .saturating_sub(self.hours_read);

        Hours {
            reader: self,
            remaining,
            failed: false,
        }
    }

    /// ヘッダーを人が読める形式で出力する。
    pub fn pretty_print<W>(&self, writer: &mut W) -> UamReaderResult<()>
    where
        W: Write,
    {
        self.header.pretty_print(writer)
    }

    /// リーダーを返して、`UamReader`を破棄する。
    pub fn into_inner(self) -> R {
        self.decoder.into_inner()
    }

    /// ファイルを閉じる。
    pub fn close(self) {
        drop(self);
    }
}

/// 1時間分のデータを順に読み込むイテレーター
///
/// `hours_per_file`回読み込むか、エラーが発生した後は`None`を返す。
pub struct Hours<'a, R> {
    /// `UamReader`
    reader: &'a mut UamReader<R>,
    /// 残りの時間数
    remaining: usize,
    /// エラーが発生したか
    failed: bool,
}

impl<'a, R> Iterator for Hours<'a, R>
where
    R: Read,
{
    type Item = UamReaderResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let result = self.reader.read_hour();
        if result.is_err() {
            self.failed = true;
        }

        Some(result)
    }
}

/// UamReaderエラー型
#[derive(Debug, Clone, thiserror::Error)]
pub enum UamReaderError {
    /// ファイル・オープン・エラー
    #[error("ファイルを開くときにエラーが発生しました。{0}")]
    Open(String),

    /// 読み込みエラー
    #[error("ファイルの読み込みに失敗しました。{0}")]
    Io(String),

    /// 形式エラー
    #[error("ファイルの形式が不正です。{0}")]
    Format(String),

    /// 認識できないファイル種別
    #[error("認識できないファイル種別です。`{0}`")]
    UnknownKind(String),

    /// 日時を構築できない
    #[error("日時を構築できませんでした。{0}")]
    InvalidDateTime(String),
}

impl UamReaderError {
    /// 読み込みエラーであるかを返す。
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Open(_) | Self::Io(_))
    }

    /// 形式エラーであるかを返す。
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_) | Self::UnknownKind(_))
    }

    /// エラーが発生した項目をメッセージの先頭に付与する。
    pub(crate) fn within(self, field: &str) -> Self {
        match self {
            Self::Open(m) => Self::Open(format!("{field}: {m}")),
            Self::Io(m) => Self::Io(format!("{field}: {m}")),
            Self::Format(m) => Self::Format(format!("{field}: {m}")),
            Self::InvalidDateTime(m) => Self::InvalidDateTime(format!("{field}: {m}")),
            Self::UnknownKind(_) => self,
        }
    }
}

/// UamReader結果型
pub type UamReaderResult<T> = Result<T, UamReaderError>;
