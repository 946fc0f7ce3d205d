use std::collections::HashMap;
use std::io::Read;

use time::PrimitiveDateTime;

use crate::codec::Decoder;
use crate::header::{julian_date_time, FileKind, Header, NAME_BYTES};
use crate::index::flatten;
use crate::readers::{UamReaderError, UamReaderResult};

/// 1時間分のデータの開始、終了日時
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HourBounds {
    /// 開始日（YYJJJ）と開始時刻（時）
    pub begin_date: i32,
    pub begin_time: f32,

    /// 終了日（YYJJJ）と終了時刻（時）
    pub end_date: i32,
    pub end_time: f32,
}

impl HourBounds {
    /// 開始時刻の整数部を、ファイル内の時間の番号として返す。
    pub fn hour_index(&self) -> i32 {
        self.begin_time as i32
    }

    /// 開始日時を返す。
    pub fn begin_date_time(&self) -> UamReaderResult<PrimitiveDateTime> {
        julian_date_time(self.begin_date, self.begin_time)
    }

    /// 終了日時を返す。
    pub fn end_date_time(&self) -> UamReaderResult<PrimitiveDateTime> {
        julian_date_time(self.end_date, self.end_time)
    }
}

/// 点源ファイルに毎時記録される点源ごとの値
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointHourRecord {
    /// 点源を含む格子の列、行、層
    pub i_cell: i32,
    pub j_cell: i32,
    pub k_cell: i32,

    /// 排出ガスの流量
    pub flow: f32,

    /// 煙の上昇高さ
    pub plume_height: f32,
}

/// 1時間分のデータ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// 開始、終了日時
    pub bounds: HourBounds,

    /// 化学種名をキー、値を格納した`Vec`を値とするマップ
    ///
    /// 格子データの場合、`Vec`の要素数は`nx * ny * nz`で、層、行、列の順に行優先で格納する。
    /// 点源データの場合、`Vec`の要素数は点源の数で、点源の番号を添字とする。
    pub values: HashMap<String, Vec<f32>>,

    /// 点源ごとの値
    ///
    /// 格子データの場合は空である。
    pub point_records: Vec<PointHourRecord>,
}

/// ファイル末尾でパディングが省略されるレコードを判定する。
///
/// ファイルの最後の時間の、最後の層の、最後の化学種のブロックには、末尾のパディングが
/// 記録されていない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordEnd {
    hours_per_file: i32,
    layers: usize,
    species: usize,
}

impl RecordEnd {
    pub(crate) fn new(hours_per_file: i32, layers: usize, species: usize) -> Self {
        Self {
            hours_per_file,
            layers,
            species,
        }
    }

    /// ファイルの最後のレコードであるかを返す。
    ///
    /// `layer`または`species`に`None`を指定した場合、その次元は判定に使用しない。
    pub(crate) fn is_last(&self, hour: i32, layer: Option<usize>, species: Option<usize>) -> bool {
        hour == self.hours_per_file - 1
            && layer.map_or(true, |k| k + 1 == self.layers)
            && species.map_or(true, |l| l + 1 == self.species)
    }
}

/// 1時間分のデータを読み込む。
///
/// エラーが発生した場合、ファイルの読み込み位置は不定になるため、以後の読み込みは信頼できない。
///
/// # 引数
///
/// * `decoder` - 1時間分のデータの先頭に位置するデコーダー
/// * `header` - ヘッダー
/// * `current_hour` - 読み込んだ開始時刻で更新する現在の時間の番号
pub(crate) fn read_frame<R>(
    decoder: &mut Decoder<R>,
    header: &Header,
    current_hour: &mut i32,
) -> UamReaderResult<Frame>
where
    R: Read,
{
    match &header.kind {
        FileKind::Emissions | FileKind::Average => {
            read_gridded_frame(decoder, header, current_hour)
        }
        FileKind::PointSource => read_point_source_frame(decoder, header, current_hour),
        FileKind::Unknown(name) => Err(UamReaderError::UnknownKind(name.clone())),
    }
}

fn read_hour_bounds<R>(decoder: &mut Decoder<R>) -> UamReaderResult<HourBounds>
where
    R: Read,
{
    let begin_date = decoder
        .read_int()
        .map_err(|e| e.within("時間別データの開始日"))?;
    let begin_time = decoder
        .read_float()
        .map_err(|e| e.within("時間別データの開始時刻"))?;
    let end_date = decoder
        .read_int()
        .map_err(|e| e.within("時間別データの終了日"))?;
    let end_time = decoder
        .read_float()
        .map_err(|e| e.within("時間別データの終了時刻"))?;

    Ok(HourBounds {
        begin_date,
        begin_time,
        end_date,
        end_time,
    })
}

/// 化学種ごとに、0で初期化した`len`要素の`Vec`を確保する。
///
/// 確保できない大きさの場合は、プロセスを中断せずに形式エラーを返す。
fn zeroed_values(header: &Header, len: usize) -> UamReaderResult<HashMap<String, Vec<f32>>> {
    let mut values = HashMap::with_capacity(header.species_names.len());
    for name in &header.species_names {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|e| {
            UamReaderError::Format(format!(
                "化学種`{name}`の値を格納する{len}要素の領域を確保できませんでした。{e}"
            ))
        })?;
        buf.resize(len, 0.0);
        values.insert(name.clone(), buf);
    }

    Ok(values)
}

fn read_gridded_frame<R>(
    decoder: &mut Decoder<R>,
    header: &Header,
    current_hour: &mut i32,
) -> UamReaderResult<Frame>
where
    R: Read,
{
    let grid = &header.grid;
    let (nx, ny, nz) = (grid.nx as usize, grid.ny as usize, grid.nz as usize);
    let dims = [nz, ny, nx];
    let species_count = header.species_names.len();
    let mut values = zeroed_values(header, grid.cell_count()).map_err(|e| {
        e.within(&format!(
            "格子数({} x {} x {})",
            grid.nx, grid.ny, grid.nz
        ))
    })?;

    let bounds = read_hour_bounds(decoder)?;
    *current_hour = bounds.hour_index();
    let hour = *current_hour;
    decoder
        .read_padding(1)
        .map_err(|e| e.within("時間別データの日時の後のパディング"))?;

    let record_end = RecordEnd::new(header.hours_per_file, nz, species_count);
    for k in 0..nz {
        // 1つの層に同じ化学種のブロックが2度記録されていないかを確認する
        let mut seen = vec![false; species_count];
        for l in 0..species_count {
            let block = format!("{k}層目の{l}番目のブロック");
            decoder
                .read_padding(2)
                .map_err(|e| e.within(&format!("{block}の前のパディング")))?;
            let species_name = decoder
                .read_packed_string(NAME_BYTES)
                .map_err(|e| e.within(&format!("{block}の化学種名")))?;
            // 記録順ではなく、ブロックに記録された化学種名で格納先を決める
            let position = header
                .species_names
                .iter()
                .position(|name| *name == species_name)
                .ok_or_else(|| {
                    UamReaderError::Format(format!(
                        "{block}に、ヘッダーに存在しない化学種`{species_name}`が記録されています。"
                    ))
                })?;
            if std::mem::replace(&mut seen[position], true) {
                return Err(UamReaderError::Format(format!(
                    "{block}に、{k}層目で既に記録された化学種`{species_name}`が再び記録されています。"
                )));
            }
            let dest = values.get_mut(&species_name).ok_or_else(|| {
                UamReaderError::Format(format!(
                    "{block}の化学種`{species_name}`の格納先がありません。"
                ))
            })?;
            for j in 0..ny {
                for i in 0..nx {
                    dest[flatten(&[k, j, i], &dims)] = decoder.read_float().map_err(|e| {
                        e.within(&format!("{species_name}の{k}層{j}行{i}列目の値"))
                    })?;
                }
            }
            if !record_end.is_last(hour, Some(k), Some(l)) {
                decoder
                    .read_padding(1)
                    .map_err(|e| e.within(&format!("{block}の後のパディング")))?;
            }
        }
        if !record_end.is_last(hour, Some(k), None) {
            decoder
                .read_padding(1)
                .map_err(|e| e.within(&format!("{k}層目の後のパディング")))?;
        }
    }

    Ok(Frame {
        bounds,
        values,
        point_records: Vec::new(),
    })
}

fn read_point_source_frame<R>(
    decoder: &mut Decoder<R>,
    header: &Header,
    current_hour: &mut i32,
) -> UamReaderResult<Frame>
where
    R: Read,
{
    let point_count = header.point_count();
    let species_count = header.species_names.len();
    let mut values = zeroed_values(header, point_count)
        .map_err(|e| e.within(&format!("点源数({point_count})")))?;

    let bounds = read_hour_bounds(decoder)?;
    *current_hour = bounds.hour_index();
    let hour = *current_hour;
    decoder
        .read_padding(6)
        .map_err(|e| e.within("時間別データの日時の後のパディング"))?;

    let mut point_records = Vec::with_capacity(point_count);
    for point in 0..point_count {
        let mut cells = [0i32; 3];
        for cell in cells.iter_mut() {
            *cell = decoder
                .read_int()
                .map_err(|e| e.within(&format!("{point}番目の点源の格子番号")))?;
        }
        let flow = decoder
            .read_float()
            .map_err(|e| e.within(&format!("{point}番目の点源の流量")))?;
        let plume_height = decoder
            .read_float()
            .map_err(|e| e.within(&format!("{point}番目の点源の煙の上昇高さ")))?;
        let [i_cell, j_cell, k_cell] = cells;
        point_records.push(PointHourRecord {
            i_cell,
            j_cell,
            k_cell,
            flow,
            plume_height,
        });
    }

    let record_end = RecordEnd::new(header.hours_per_file, 1, species_count);
    for (l, species_name) in header.species_names.iter().enumerate() {
        decoder
            .read_padding(1)
            .map_err(|e| e.within(&format!("{l}番目の化学種のブロックの前のパディング")))?;
        // 化学種はヘッダーと同じ順に記録されているとみなす
        let block_name = decoder
            .read_packed_string(NAME_BYTES)
            .map_err(|e| e.within(&format!("{l}番目の化学種のブロックの化学種名")))?;
        if block_name != *species_name {
            log::warn!(
                "{l}番目のブロックの化学種名`{block_name}`がヘッダーの`{species_name}`と一致しません。"
            );
        }
        let dest = values.get_mut(species_name).ok_or_else(|| {
            UamReaderError::Format(format!(
                "{l}番目の化学種`{species_name}`の格納先がありません。"
            ))
        })?;
        for (point, value) in dest.iter_mut().enumerate() {
            *value = decoder
                .read_float()
                .map_err(|e| e.within(&format!("{species_name}の{point}番目の点源の値")))?;
        }
        if !record_end.is_last(hour, None, Some(l)) {
            decoder
                .read_padding(2)
                .map_err(|e| e.within(&format!("{species_name}のブロックの後のパディング")))?;
        }
    }
    if !record_end.is_last(hour, None, None) {
        decoder
            .read_padding(2)
            .map_err(|e| e.within("時間別データ末尾のパディング"))?;
    }

    Ok(Frame {
        bounds,
        values,
        point_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_final_block_of_the_final_hour_is_last() {
        let end = RecordEnd::new(24, 2, 3);
        assert!(end.is_last(23, Some(1), Some(2)));
        assert!(!end.is_last(22, Some(1), Some(2)));
        assert!(!end.is_last(23, Some(0), Some(2)));
        assert!(!end.is_last(23, Some(1), Some(1)));
    }

    #[test]
    fn unspecified_dimensions_are_ignored() {
        let end = RecordEnd::new(24, 2, 3);
        assert!(end.is_last(23, Some(1), None));
        assert!(!end.is_last(23, Some(0), None));
        assert!(end.is_last(23, None, Some(2)));
        assert!(!end.is_last(23, None, Some(0)));
        assert!(end.is_last(23, None, None));
        assert!(!end.is_last(0, None, None));
    }

    #[test]
    fn oversized_buffers_are_format_errors() {
        let header = Header {
            kind: FileKind::Emissions,
            name: String::from("EMISSIONS"),
            note: String::new(),
            segment_count: 1,
            species_count: 1,
            start_date: 2182,
            start_time: 0.0,
            end_date: 2182,
            end_time: 24.0,
            grid: Default::default(),
            species_names: vec![String::from("A")],
            stacks: Default::default(),
            hours_per_file: 24,
        };
        assert_eq!(zeroed_values(&header, 3).unwrap()["A"], vec![0.0; 3]);
        let err = zeroed_values(&header, usize::MAX / 2).unwrap_err();
        assert!(err.is_format(), "{err}");
    }

    #[test]
    fn hour_index_truncates_begin_time() {
        let bounds = HourBounds {
            begin_date: 2182,
            begin_time: 23.75,
            end_date: 2183,
            end_time: 0.0,
        };
        assert_eq!(bounds.hour_index(), 23);
    }
}
