//! UAM形式のファイルを構成する基本要素（整数、浮動小数点数、パディング、文字列）を読み込む。
//!
//! UAM形式は、Fortranの順次アクセス書式なしファイルとして記録されている。
//! すべての値は4バイト（1ワード）単位で記録され、レコードの前後にはレコード長を示す
//! ワードが付与されている。本モジュールでは、レコード長を示すワードを意味を持たない
//! パディングとして読み飛ばす。
use std::io::{self, Read};

use crate::readers::{UamReaderError, UamReaderResult};

/// 1ワードのバイト数
pub const WORD_BYTES: usize = 4;

/// バイト順
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteOrder {
    /// ビッグエンディアン
    #[default]
    BigEndian,

    /// リトルエンディアン
    LittleEndian,
}

/// 設定されたバイト順で、ストリームから基本要素を読み込むデコーダー
#[derive(Debug)]
pub struct Decoder<R> {
    /// リーダー
    reader: R,

    /// バイト順
    ///
    /// デコーダーを構築した後は変更できない。
    byte_order: ByteOrder,
}

impl<R> Decoder<R>
where
    R: Read,
{
    /// デコーダーを構築する。
    ///
    /// # 引数
    ///
    /// * `reader` - UAMファイルを読み込むリーダー
    /// * `byte_order` - ファイルに記録されている数値のバイト順
    pub fn new(reader: R, byte_order: ByteOrder) -> Self {
        Self { reader, byte_order }
    }

    /// バイト順を返す。
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// リーダーを返して、デコーダーを破棄する。
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_word(&mut self) -> UamReaderResult<[u8; WORD_BYTES]> {
        let mut buf = [0u8; WORD_BYTES];
        self.reader.read_exact(&mut buf).map_err(|e| {
            UamReaderError::Io(format!(
                "ファイルから{WORD_BYTES}バイトの読み込みに失敗しました。{e}"
            ))
        })?;

        Ok(buf)
    }

    /// 4バイトの符号付き整数を読み込む。
    pub fn read_int(&mut self) -> UamReaderResult<i32> {
        let buf = self.read_word()?;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => i32::from_be_bytes(buf),
            ByteOrder::LittleEndian => i32::from_le_bytes(buf),
        })
    }

    /// 4バイトのIEEE 754単精度浮動小数点数を読み込む。
    pub fn read_float(&mut self) -> UamReaderResult<f32> {
        let buf = self.read_word()?;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => f32::from_be_bytes(buf),
            ByteOrder::LittleEndian => f32::from_le_bytes(buf),
        })
    }

    /// `words`ワード分のパディングを読み飛ばす。
    ///
    /// ストリームの終端に達して、指定されたワード数を読み飛ばせなかった場合はエラーを返す。
    pub fn read_padding(&mut self, words: usize) -> UamReaderResult<()> {
        let bytes = (words * WORD_BYTES) as u64;
        let skipped = io::copy(&mut (&mut self.reader).take(bytes), &mut io::sink())
            .map_err(|e| {
                UamReaderError::Io(format!(
                    "{words}ワードのパディングの読み飛ばしに失敗しました。{e}"
                ))
            })?;
        if skipped != bytes {
            return Err(UamReaderError::Io(format!(
                "{words}ワードのパディングを読み飛ばす前にファイルの終端に達しました。\
                 読み飛ばせたのは{skipped}バイトです。"
            )));
        }

        Ok(())
    }

    /// 1文字を4バイトで記録した文字列を読み込む。
    ///
    /// # 引数
    ///
    /// * `bytes` - 読み込むバイト数（4の倍数）
    ///
    /// # 戻り値
    ///
    /// 前後の空白文字をトリムした文字列
    pub fn read_packed_string(&mut self, bytes: usize) -> UamReaderResult<String> {
        if bytes % WORD_BYTES != 0 {
            return Err(UamReaderError::Format(format!(
                "文字列のバイト数({bytes})が{WORD_BYTES}の倍数ではありません。"
            )));
        }
        let mut buf = vec![0u8; bytes];
        self.reader.read_exact(&mut buf).map_err(|e| {
            UamReaderError::Io(format!(
                "ファイルから{bytes}バイトの読み込みに失敗しました。{e}"
            ))
        })?;

        Ok(unpack_str(&buf))
    }
}

/// 4バイトごとに先頭の1バイトだけを文字として取り出し、前後の空白をトリムする。
///
/// 取り出したバイトはLatin-1として解釈するため、変換に失敗することはない。
pub fn unpack_str(buf: &[u8]) -> String {
    let s: String = buf
        .iter()
        .step_by(WORD_BYTES)
        .map(|&b| char::from(b))
        .collect();

    s.trim_matches(' ').to_string()
}
