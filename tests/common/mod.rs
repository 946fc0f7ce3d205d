//! 試験用のUAMファイルを組み立てる。
#![allow(dead_code)]

use camx_uam::ByteOrder;

/// パディングとして書き込むバイト列
const PAD: [u8; 4] = [0xaa, 0xbb, 0xcc, 0xdd];

pub const START_DATE: i32 = 2182;

pub struct UamBuilder {
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl UamBuilder {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            bytes: Vec::new(),
        }
    }

    pub fn int(&mut self, value: i32) -> &mut Self {
        let word = match self.order {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        };
        self.bytes.extend_from_slice(&word);
        self
    }

    pub fn float(&mut self, value: f32) -> &mut Self {
        let word = match self.order {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        };
        self.bytes.extend_from_slice(&word);
        self
    }

    pub fn pad(&mut self, words: usize) -> &mut Self {
        for _ in 0..words {
            self.bytes.extend_from_slice(&PAD);
        }
        self
    }

    /// 1文字を4バイトの先頭に置き、残りの3バイトを0で埋める。
    pub fn string(&mut self, text: &str, bytes: usize) -> &mut Self {
        let mut chars = text.bytes();
        for _ in 0..bytes / 4 {
            self.bytes.push(chars.next().unwrap_or(b' '));
            self.bytes.extend_from_slice(&[0, 0, 0]);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    /// ヘッダーを書き込む。`stacks`は名前が`PTSOURCE`の場合だけ書き込む。
    pub fn header(
        &mut self,
        name: &str,
        species: &[&str],
        (nx, ny, nz): (i32, i32, i32),
        stacks: &[[f32; 6]],
    ) -> &mut Self {
        self.pad(1)
            .string(name, 40)
            .string("synthetic test file", 240)
            .int(1)
            .int(species.len() as i32)
            .int(START_DATE)
            .float(0.0)
            .int(START_DATE)
            .float(24.0)
            .pad(2);
        self.float(-100.0)
            .float(50.0)
            .int(17)
            .float(300_000.0)
            .float(4_000_000.0)
            .float(4_000.0)
            .float(2_000.0)
            .int(nx)
            .int(ny)
            .int(nz)
            .int(1)
            .int(nz)
            .float(20.0)
            .float(50.0)
            .float(1_000.0)
            .pad(2);
        self.int(1).int(1).int(nx).int(ny).pad(2);
        for species_name in species {
            self.string(species_name, 40);
        }
        if name == "PTSOURCE" {
            self.pad(3).int(stacks.len() as i32).pad(2);
            for stack in stacks {
                for &value in stack {
                    self.float(value);
                }
            }
        }
        self.pad(2)
    }

    /// 格子データの1時間分を書き込む。
    ///
    /// `blocks`は層ごとに記録する化学種名の順序、`value`は(化学種名, 層, 行, 列)から値を返す。
    pub fn gridded_hour<F>(
        &mut self,
        hour: i32,
        hours_per_file: i32,
        blocks: &[&str],
        (nx, ny, nz): (usize, usize, usize),
        value: F,
    ) -> &mut Self
    where
        F: Fn(&str, usize, usize, usize) -> f32,
    {
        self.hour_bounds(hour).pad(1);
        let last_hour = hour == hours_per_file - 1;
        for k in 0..nz {
            for (l, name) in blocks.iter().enumerate() {
                self.pad(2).string(name, 40);
                for j in 0..ny {
                    for i in 0..nx {
                        self.float(value(name, k, j, i));
                    }
                }
                if !(last_hour && k == nz - 1 && l == blocks.len() - 1) {
                    self.pad(1);
                }
            }
            if !(last_hour && k == nz - 1) {
                self.pad(1);
            }
        }
        self
    }

    /// 点源データの1時間分を書き込む。
    ///
    /// `records`は点源ごとの(i, j, k, 流量, 煙の上昇高さ)、`value`は(化学種の番号, 点源の番号)から値を返す。
    pub fn point_hour<F>(
        &mut self,
        hour: i32,
        hours_per_file: i32,
        species: &[&str],
        records: &[(i32, i32, i32, f32, f32)],
        value: F,
    ) -> &mut Self
    where
        F: Fn(usize, usize) -> f32,
    {
        self.hour_bounds(hour).pad(6);
        for &(i, j, k, flow, plume) in records {
            self.int(i).int(j).int(k).float(flow).float(plume);
        }
        let last_hour = hour == hours_per_file - 1;
        for (l, name) in species.iter().enumerate() {
            self.pad(1).string(name, 40);
            for point in 0..records.len() {
                self.float(value(l, point));
            }
            if !(last_hour && l == species.len() - 1) {
                self.pad(2);
            }
        }
        if !last_hour {
            self.pad(2);
        }
        self
    }

    fn hour_bounds(&mut self, hour: i32) -> &mut Self {
        self.int(START_DATE)
            .float(hour as f32)
            .int(START_DATE)
            .float(hour as f32 + 1.0)
    }
}

/// 値から(化学種名, 層, 行, 列)を復元できるように値を決める。
pub fn cell_value(name: &str, k: usize, j: usize, i: usize) -> f32 {
    let species = name.bytes().map(|b| b as usize).sum::<usize>() % 97;
    (species * 10_000 + k * 1_000 + j * 100 + i) as f32
}
