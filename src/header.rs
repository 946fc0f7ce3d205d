use std::io::{Read, Write};

use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::codec::Decoder;
use crate::readers::{UamReaderError, UamReaderResult};

/// 名前や化学種名を記録した文字列のバイト数
pub const NAME_BYTES: usize = 40;

/// 備考を記録した文字列のバイト数
pub const NOTE_BYTES: usize = 240;

/// 排出量ファイルの種別を示す名前
const EMISSIONS_TAG: &str = "EMISSIONS";

/// 平均値ファイルの種別を示す名前
const AVERAGE_TAG: &str = "AVERAGE";

/// 点源ファイルの種別を示す名前
const POINT_SOURCE_TAG: &str = "PTSOURCE";

/// 時間の上限
///
/// ファイルの開始、終了時刻にこれより大きな時間が記録されている場合は不正とみなす。
const MAX_HOURS: f32 = 24.0 * 366.0;

/// ファイル種別
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// 格子別の排出量
    Emissions,

    /// 格子別の平均値
    Average,

    /// 点源（煙突）別の排出量
    PointSource,

    /// 認識できない種別
    ///
    /// ヘッダーは読み込めるが、時間別のデータは読み込めない。
    Unknown(String),
}

impl FileKind {
    /// 格子データを記録したファイルであるかを返す。
    pub fn is_gridded(&self) -> bool {
        matches!(self, Self::Emissions | Self::Average)
    }
}

/// ファイルに記録された名前からファイル種別に変換する。
impl From<&str> for FileKind {
    fn from(value: &str) -> Self {
        match value {
            EMISSIONS_TAG => Self::Emissions,
            AVERAGE_TAG => Self::Average,
            POINT_SOURCE_TAG => Self::PointSource,
            _ => Self::Unknown(value.to_string()),
        }
    }
}

/// 格子系定義
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GridDefinition {
    /// 原点のx座標
    pub origin_x: f32,
    /// 原点のy座標
    pub origin_y: f32,

    /// UTMゾーン番号
    pub utm_zone: i32,

    /// 格子の南西端の座標
    pub utm_x: f32,
    pub utm_y: f32,

    /// 格子の幅と高さ
    pub dx: f32,
    pub dy: f32,

    /// 列方向、行方向、鉛直方向の格子数
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,

    /// 鉛直層の下限と上限
    pub nz_lo: i32,
    pub nz_up: i32,

    /// 地表層、下層、上層の高さ
    pub height_surface: f32,
    pub height_lower: f32,
    pub height_upper: f32,
}

impl GridDefinition {
    /// 1層あたりの格子数を返す。
    pub fn cells_per_layer(&self) -> usize {
        self.nx as usize * self.ny as usize
    }

    /// 全層の格子数を返す。
    pub fn cell_count(&self) -> usize {
        self.cells_per_layer() * self.nz as usize
    }
}

/// 煙突の諸元
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stack {
    pub x: f32,
    pub y: f32,
    /// 煙突の高さ（m）
    pub height: f32,
    /// 煙突の直径（m）
    pub diameter: f32,
    /// 排出ガスの温度（K）
    pub temperature: f32,
    /// 排出速度（m/hr）
    pub velocity: f32,
}

/// 煙突の諸元表
///
/// 6つの要素を、点源の番号を添字とする並列した`Vec`で保持する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackTable {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub height: Vec<f32>,
    pub diameter: Vec<f32>,
    pub temperature: Vec<f32>,
    pub velocity: Vec<f32>,
}

impl StackTable {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            height: Vec::with_capacity(capacity),
            diameter: Vec::with_capacity(capacity),
            temperature: Vec::with_capacity(capacity),
            velocity: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, stack: Stack) {
        self.x.push(stack.x);
        self.y.push(stack.y);
        self.height.push(stack.height);
        self.diameter.push(stack.diameter);
        self.temperature.push(stack.temperature);
        self.velocity.push(stack.velocity);
    }

    /// 点源の数を返す。
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// 点源が記録されていないかを返す。
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 指定された点源の諸元を返す。
    pub fn get(&self, point: usize) -> Option<Stack> {
        Some(Stack {
            x: *self.x.get(point)?,
            y: *self.y.get(point)?,
            height: *self.height.get(point)?,
            diameter: *self.diameter.get(point)?,
            temperature: *self.temperature.get(point)?,
            velocity: *self.velocity.get(point)?,
        })
    }
}

/// ヘッダー
///
/// ファイルを開いたときに1度だけ読み込まれ、以後は変更されない。
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// ファイル種別
    pub kind: FileKind,

    /// ファイルに記録されている名前（ファイル種別を示す）
    pub name: String,

    /// 備考
    pub note: String,

    /// セグメント数
    pub segment_count: i32,

    /// 化学種の数
    pub species_count: i32,

    /// 開始日（YYJJJ）と開始時刻（時）
    pub start_date: i32,
    pub start_time: f32,

    /// 終了日（YYJJJ）と終了時刻（時）
    pub end_date: i32,
    pub end_time: f32,

    /// 格子系定義
    pub grid: GridDefinition,

    /// 化学種名
    ///
    /// 要素数は`species_count`と一致する。
    pub species_names: Vec<String>,

    /// 煙突の諸元表
    ///
    /// 点源ファイル以外では空である。
    pub stacks: StackTable,

    /// 1ファイルに記録されている時間数
    ///
    /// ファイルには記録されておらず、ファイルを開くときに指定する。
    pub hours_per_file: i32,
}

impl Header {
    /// 点源の数を返す。
    pub fn point_count(&self) -> usize {
        self.stacks.len()
    }

    /// ファイルの開始日時を返す。
    pub fn start_date_time(&self) -> UamReaderResult<PrimitiveDateTime> {
        julian_date_time(self.start_date, self.start_time)
    }

    /// ファイルの終了日時を返す。
    pub fn end_date_time(&self) -> UamReaderResult<PrimitiveDateTime> {
        julian_date_time(self.end_date, self.end_time)
    }

    /// 格子系の情報を返す。
    pub fn info(&self) -> GridInfo {
        GridInfo {
            dx: self.grid.dx,
            dy: self.grid.dy,
            nx: self.grid.nx,
            ny: self.grid.ny,
            nz: self.grid.nz,
            utm_x: self.grid.utm_x,
            utm_y: self.grid.utm_y,
            species_names: self.species_names.clone(),
        }
    }

    /// ヘッダーを人が読める形式で出力する。
    pub fn pretty_print<W>(&self, writer: &mut W) -> UamReaderResult<()>
    where
        W: Write,
    {
        self.write_summary(writer)
            .map_err(|e| UamReaderError::Io(format!("ヘッダーの出力に失敗しました。{e}")))
    }

    fn write_summary<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: Write,
    {
        let g = &self.grid;
        writeln!(writer, "name: {} ({:?})", self.name, self.kind)?;
        writeln!(writer, "note: {}", self.note)?;
        writeln!(writer, "segments: {}", self.segment_count)?;
        writeln!(
            writer,
            "period: {} {:.2} - {} {:.2}",
            self.start_date, self.start_time, self.end_date, self.end_time
        )?;
        writeln!(
            writer,
            "origin: ({}, {}), utm zone: {}, sw corner: ({}, {})",
            g.origin_x, g.origin_y, g.utm_zone, g.utm_x, g.utm_y
        )?;
        writeln!(writer, "cell size: {} x {}", g.dx, g.dy)?;
        writeln!(
            writer,
            "cells: {} x {} x {} (layers {}..{})",
            g.nx, g.ny, g.nz, g.nz_lo, g.nz_up
        )?;
        writeln!(
            writer,
            "heights: {} {} {}",
            g.height_surface, g.height_lower, g.height_upper
        )?;
        writeln!(
            writer,
            "species ({}): {}",
            self.species_count,
            self.species_names.join(", ")
        )?;
        if self.kind == FileKind::PointSource {
            writeln!(writer, "points: {}", self.point_count())?;
            for point in 0..self.point_count() {
                if let Some(s) = self.stacks.get(point) {
                    writeln!(
                        writer,
                        "  {point}: ({}, {}) h={} d={} t={} v={}",
                        s.x, s.y, s.height, s.diameter, s.temperature, s.velocity
                    )?;
                }
            }
        }

        Ok(())
    }
}

/// 格子系の情報
///
/// 格子の位置と大きさだけを必要とする利用者向けに、ヘッダーの一部を射影したもの。
#[derive(Debug, Clone, PartialEq)]
pub struct GridInfo {
    pub dx: f32,
    pub dy: f32,
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
    /// 格子の南西端の座標
    pub utm_x: f32,
    pub utm_y: f32,
    pub species_names: Vec<String>,
}

impl GridInfo {
    /// 指定された格子の中心座標を返す。
    ///
    /// 行は南から北に、列は西から東に数える。
    pub fn cell_center(&self, row: usize, column: usize) -> (f64, f64) {
        let x = self.utm_x as f64 + (column as f64 + 0.5) * self.dx as f64;
        let y = self.utm_y as f64 + (row as f64 + 0.5) * self.dy as f64;

        (x, y)
    }
}

/// ユリウス日（YYJJJまたはYYYYJJJ）と時間から日時を構築する。
///
/// 2桁の年は、50以上を1900年代、50未満を2000年代とみなす。
/// 時間の小数部は分に変換し、24時は翌日の0時とする。
///
/// # 引数
///
/// * `date` - ユリウス日
/// * `hours` - 0時からの経過時間
///
/// # 戻り値
///
/// 日時
pub fn julian_date_time(date: i32, hours: f32) -> UamReaderResult<PrimitiveDateTime> {
    if date < 0 {
        return Err(UamReaderError::InvalidDateTime(format!(
            "日付({date})が負の値です。"
        )));
    }
    if !hours.is_finite() || !(0.0..=MAX_HOURS).contains(&hours) {
        return Err(UamReaderError::InvalidDateTime(format!(
            "時間({hours})が範囲外です。"
        )));
    }
    let year = match date / 1000 {
        yy @ 0..=49 => 2000 + yy,
        yy @ 50..=99 => 1900 + yy,
        yyyy => yyyy,
    };
    let ordinal = (date % 1000) as u16;
    let date = Date::from_ordinal_date(year, ordinal).map_err(|e| {
        UamReaderError::InvalidDateTime(format!(
            "ユリウス日({date})から日付を構築できませんでした。{e}"
        ))
    })?;
    let minutes = (hours as f64 * 60.0).round() as i64;

    PrimitiveDateTime::new(date, Time::MIDNIGHT)
        .checked_add(Duration::minutes(minutes))
        .ok_or_else(|| {
            UamReaderError::InvalidDateTime(format!(
                "日付({date})に時間({hours})を加算できませんでした。"
            ))
        })
}

fn non_negative(value: i32, field: &str) -> UamReaderResult<i32> {
    if value < 0 {
        return Err(UamReaderError::Format(format!(
            "ヘッダーの{field}が負の値({value})です。"
        )));
    }

    Ok(value)
}

/// ヘッダーを読み込む。
///
/// ヘッダーの各項目は位置で識別されるため、記録順に読み込む。
///
/// # 引数
///
/// * `decoder` - ファイルの先頭に位置するデコーダー
/// * `hours_per_file` - 1ファイルに記録されている時間数
pub(crate) fn read_header<R>(
    decoder: &mut Decoder<R>,
    hours_per_file: i32,
) -> UamReaderResult<Header>
where
    R: Read,
{
    decoder
        .read_padding(1)
        .map_err(|e| e.within("ヘッダー先頭のパディング"))?;
    let name = decoder
        .read_packed_string(NAME_BYTES)
        .map_err(|e| e.within("ヘッダーの名前"))?;
    let note = decoder
        .read_packed_string(NOTE_BYTES)
        .map_err(|e| e.within("ヘッダーの備考"))?;
    let segment_count = decoder
        .read_int()
        .map_err(|e| e.within("ヘッダーのセグメント数"))?;
    let species_count = decoder
        .read_int()
        .map_err(|e| e.within("ヘッダーの化学種の数"))?;
    let species_count = non_negative(species_count, "化学種の数")?;
    let start_date = decoder
        .read_int()
        .map_err(|e| e.within("ヘッダーの開始日"))?;
    let start_time = decoder
        .read_float()
        .map_err(|e| e.within("ヘッダーの開始時刻"))?;
    let end_date = decoder
        .read_int()
        .map_err(|e| e.within("ヘッダーの終了日"))?;
    let end_time = decoder
        .read_float()
        .map_err(|e| e.within("ヘッダーの終了時刻"))?;
    decoder
        .read_padding(2)
        .map_err(|e| e.within("ヘッダーの期間の後のパディング"))?;

    let grid = read_grid_definition(decoder)?;

    decoder
        .read_padding(2)
        .map_err(|e| e.within("ヘッダーの格子系定義の後のパディング"))?;
    // 部分領域の添字（i1, j1, nx1, ny1）は使用しない
    for _ in 0..4 {
        decoder
            .read_int()
            .map_err(|e| e.within("ヘッダーの部分領域の添字"))?;
    }
    decoder
        .read_padding(2)
        .map_err(|e| e.within("ヘッダーの部分領域の後のパディング"))?;

    let mut species_names = Vec::new();
    for l in 0..species_count {
        let species_name = decoder
            .read_packed_string(NAME_BYTES)
            .map_err(|e| e.within(&format!("ヘッダーの{l}番目の化学種名")))?;
        species_names.push(species_name);
    }

    let kind = FileKind::from(name.as_str());
    let stacks = if kind == FileKind::PointSource {
        read_stack_table(decoder)?
    } else {
        StackTable::default()
    };

    decoder
        .read_padding(2)
        .map_err(|e| e.within("ヘッダー末尾のパディング"))?;

    Ok(Header {
        kind,
        name,
        note,
        segment_count,
        species_count,
        start_date,
        start_time,
        end_date,
        end_time,
        grid,
        species_names,
        stacks,
        hours_per_file,
    })
}

fn read_grid_definition<R>(decoder: &mut Decoder<R>) -> UamReaderResult<GridDefinition>
where
    R: Read,
{
    let origin_x = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の原点のx座標"))?;
    let origin_y = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の原点のy座標"))?;
    let utm_zone = decoder
        .read_int()
        .map_err(|e| e.within("格子系定義のUTMゾーン番号"))?;
    let utm_x = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の南西端のx座標"))?;
    let utm_y = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の南西端のy座標"))?;
    let dx = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の格子の幅"))?;
    let dy = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の格子の高さ"))?;
    let nx = decoder
        .read_int()
        .map_err(|e| e.within("格子系定義の列方向の格子数"))?;
    let ny = decoder
        .read_int()
        .map_err(|e| e.within("格子系定義の行方向の格子数"))?;
    let nz = decoder
        .read_int()
        .map_err(|e| e.within("格子系定義の層数"))?;
    let nz_lo = decoder
        .read_int()
        .map_err(|e| e.within("格子系定義の層の下限"))?;
    let nz_up = decoder
        .read_int()
        .map_err(|e| e.within("格子系定義の層の上限"))?;
    let height_surface = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の地表層の高さ"))?;
    let height_lower = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の下層の高さ"))?;
    let height_upper = decoder
        .read_float()
        .map_err(|e| e.within("格子系定義の上層の高さ"))?;

    let nx = non_negative(nx, "列方向の格子数")?;
    let ny = non_negative(ny, "行方向の格子数")?;
    let nz = non_negative(nz, "層数")?;
    (nx as usize)
        .checked_mul(ny as usize)
        .and_then(|cells| cells.checked_mul(nz as usize))
        .ok_or_else(|| {
            UamReaderError::Format(format!(
                "格子数({nx} x {ny} x {nz})が大きすぎます。"
            ))
        })?;

    Ok(GridDefinition {
        origin_x,
        origin_y,
        utm_zone,
        utm_x,
        utm_y,
        dx,
        dy,
        nx,
        ny,
        nz,
        nz_lo,
        nz_up,
        height_surface,
        height_lower,
        height_upper,
    })
}

fn read_stack_table<R>(decoder: &mut Decoder<R>) -> UamReaderResult<StackTable>
where
    R: Read,
{
    decoder
        .read_padding(3)
        .map_err(|e| e.within("点源数の前のパディング"))?;
    let point_count = decoder.read_int().map_err(|e| e.within("点源数"))?;
    let point_count = non_negative(point_count, "点源数")? as usize;
    decoder
        .read_padding(2)
        .map_err(|e| e.within("点源数の後のパディング"))?;

    let mut stacks = StackTable::with_capacity(point_count.min(4096));
    for point in 0..point_count {
        let mut fields = [0f32; 6];
        for field in fields.iter_mut() {
            *field = decoder
                .read_float()
                .map_err(|e| e.within(&format!("{point}番目の点源の諸元")))?;
        }
        let [x, y, height, diameter, temperature, velocity] = fields;
        stacks.push(Stack {
            x,
            y,
            height,
            diameter,
            temperature,
            velocity,
        });
    }

    Ok(stacks)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn kind_is_decided_from_name() {
        assert_eq!(FileKind::from("EMISSIONS"), FileKind::Emissions);
        assert_eq!(FileKind::from("AVERAGE"), FileKind::Average);
        assert_eq!(FileKind::from("PTSOURCE"), FileKind::PointSource);
        assert_eq!(
            FileKind::from("FOOBAR"),
            FileKind::Unknown(String::from("FOOBAR"))
        );
        assert!(FileKind::Average.is_gridded());
        assert!(!FileKind::PointSource.is_gridded());
    }

    #[test]
    fn julian_dates_with_two_digit_years() {
        assert_eq!(
            julian_date_time(2182, 0.0).unwrap(),
            datetime!(2002-07-01 0:00)
        );
        assert_eq!(
            julian_date_time(95001, 13.5).unwrap(),
            datetime!(1995-01-01 13:30)
        );
    }

    #[test]
    fn julian_dates_with_four_digit_years() {
        assert_eq!(
            julian_date_time(2016366, 23.0).unwrap(),
            datetime!(2016-12-31 23:00)
        );
    }

    #[test]
    fn hour_24_rolls_over_to_next_day() {
        assert_eq!(
            julian_date_time(2182, 24.0).unwrap(),
            datetime!(2002-07-02 0:00)
        );
    }

    #[test]
    fn invalid_julian_dates_are_rejected() {
        assert!(julian_date_time(2000, 0.0).is_err());
        assert!(julian_date_time(2367, 0.0).is_err());
        assert!(julian_date_time(-1, 0.0).is_err());
        assert!(julian_date_time(2182, f32::NAN).is_err());
        assert!(julian_date_time(2182, -1.0).is_err());
    }

    #[test]
    fn stack_table_rows() {
        let mut stacks = StackTable::default();
        assert!(stacks.is_empty());
        let stack = Stack {
            x: 1.0,
            y: 2.0,
            height: 30.0,
            diameter: 1.5,
            temperature: 400.0,
            velocity: 3600.0,
        };
        stacks.push(stack);
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks.get(0), Some(stack));
        assert_eq!(stacks.get(1), None);
    }

    #[test]
    fn cell_center_is_offset_from_south_west_corner() {
        let info = GridInfo {
            dx: 4.0,
            dy: 2.0,
            nx: 3,
            ny: 3,
            nz: 1,
            utm_x: 100.0,
            utm_y: 200.0,
            species_names: Vec::new(),
        };
        assert_eq!(info.cell_center(0, 0), (102.0, 201.0));
        assert_eq!(info.cell_center(2, 1), (106.0, 205.0));
    }
}
