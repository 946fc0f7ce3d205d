//! 多次元配列の添字を、行優先（最後の次元が最も速く変化する）の1次元添字に変換する。

/// 多次元の添字を行優先で1次元の添字に変換する。
///
/// 格子データでは、添字に`[層, 行, 列]`を、次元に`[nz, ny, nx]`を指定する。
///
/// # 引数
///
/// * `indices` - 各次元の添字
/// * `dims` - 各次元の大きさ
///
/// # 戻り値
///
/// `Σ indices[i] * Π dims[j] (j > i)`
///
/// # Panics
///
/// `indices`と`dims`の長さが異なる場合
pub fn flatten(indices: &[usize], dims: &[usize]) -> usize {
    assert_eq!(
        indices.len(),
        dims.len(),
        "添字の数と次元の数が一致しません。"
    );

    indices
        .iter()
        .zip(dims)
        .fold(0, |acc, (&index, &dim)| acc * dim + index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_layer_row_column() {
        assert_eq!(flatten(&[0, 1, 1], &[1, 2, 2]), 3);
        assert_eq!(flatten(&[1, 0, 0], &[2, 3, 4]), 12);
        assert_eq!(flatten(&[1, 2, 3], &[2, 3, 4]), 23);
    }

    #[test]
    fn flattens_other_ranks() {
        assert_eq!(flatten(&[], &[]), 0);
        assert_eq!(flatten(&[5], &[9]), 5);
        assert_eq!(flatten(&[2, 7], &[3, 10]), 27);
        assert_eq!(flatten(&[1, 0, 1, 1], &[2, 2, 2, 2]), 11);
    }

    #[test]
    #[should_panic]
    fn rank_mismatch_panics() {
        flatten(&[0, 0], &[1, 1, 1]);
    }
}
